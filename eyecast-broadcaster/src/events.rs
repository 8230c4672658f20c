use eyecast_device::{DeviceState, EyePositionData, GazePointData, HeadPoseData, StreamSample};
use serde::{Deserialize, Serialize};

/// Messages sent to clients, serialized as `{"type": ..., "data": ...}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Envelope {
    /// Full device state snapshot
    #[serde(rename = "state")]
    State(DeviceState),

    #[serde(rename = "gazePoint")]
    GazePoint(GazePointData),

    #[serde(rename = "headPose")]
    HeadPose(HeadPoseData),

    #[serde(rename = "eyePosition")]
    EyePosition(EyePositionData),
}

impl Envelope {
    /// Envelope `type` on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            Envelope::State(_) => "state",
            Envelope::GazePoint(_) => "gazePoint",
            Envelope::HeadPose(_) => "headPose",
            Envelope::EyePosition(_) => "eyePosition",
        }
    }

    /// Convert envelope to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<StreamSample> for Envelope {
    fn from(sample: StreamSample) -> Self {
        match sample {
            StreamSample::GazePoint(data) => Envelope::GazePoint(data),
            StreamSample::HeadPose(data) => Envelope::HeadPose(data),
            StreamSample::EyePosition(data) => Envelope::EyePosition(data),
        }
    }
}
