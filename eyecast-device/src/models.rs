//! Data models for device state and stream samples
//!
//! Field names follow the JSON shape existing eye-tracking web clients
//! consume: the state record is camelCase, sample payloads are PascalCase,
//! and enumerations serialize as their symbolic names.

use serde::{Deserialize, Serialize};

/// Result of the startup availability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Engine is not installed
    NotAvailable,
    /// Engine is installed but not started
    NotRunning,
    Available,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::NotAvailable => write!(f, "not available"),
            Availability::NotRunning => write!(f, "not running"),
            Availability::Available => write!(f, "available"),
        }
    }
}

/// On-demand sample streams offered by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    GazePoint,
    HeadPose,
    EyePosition,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [
        StreamKind::GazePoint,
        StreamKind::HeadPose,
        StreamKind::EyePosition,
    ];

    /// Position in per-kind tables
    pub const fn index(self) -> usize {
        match self {
            StreamKind::GazePoint => 0,
            StreamKind::HeadPose => 1,
            StreamKind::EyePosition => 2,
        }
    }

    /// Envelope `type` used on the wire
    pub const fn wire_name(self) -> &'static str {
        match self {
            StreamKind::GazePoint => "gazePoint",
            StreamKind::HeadPose => "headPose",
            StreamKind::EyePosition => "eyePosition",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserPresence {
    #[default]
    Unknown,
    Present,
    NotPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EyeTrackingDeviceStatus {
    #[default]
    Unknown,
    Initializing,
    Configuring,
    Tracking,
    TrackingPaused,
    InvalidConfiguration,
    DeviceNotConnected,
    NotAvailable,
    ConnectionError,
    UnknownError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GazeTracking {
    #[default]
    Unknown,
    GazeTracked,
    GazeNotTracked,
}

/// Screen area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Physical display size in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Last known value of every device facet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub user_presence: UserPresence,
    pub user_profile_name: Option<String>,
    pub eye_tracking_device_status: EyeTrackingDeviceStatus,
    pub gaze_tracking: GazeTracking,
    pub screen_bounds: Rectangle,
    pub display_size: Size,
}

impl DeviceState {
    /// Replace the facet carried by `change`; other facets keep their value.
    pub fn apply(&mut self, change: FacetChange) {
        match change {
            FacetChange::UserPresence(v) => self.user_presence = v,
            FacetChange::UserProfileName(v) => self.user_profile_name = v,
            FacetChange::EyeTrackingDeviceStatus(v) => self.eye_tracking_device_status = v,
            FacetChange::GazeTracking(v) => self.gaze_tracking = v,
            FacetChange::ScreenBounds(v) => self.screen_bounds = v,
            FacetChange::DisplaySize(v) => self.display_size = v,
        }
    }
}

/// A new value for exactly one facet
#[derive(Debug, Clone, PartialEq)]
pub enum FacetChange {
    UserPresence(UserPresence),
    UserProfileName(Option<String>),
    EyeTrackingDeviceStatus(EyeTrackingDeviceStatus),
    GazeTracking(GazeTracking),
    ScreenBounds(Rectangle),
    DisplaySize(Size),
}

impl FacetChange {
    pub fn facet_name(&self) -> &'static str {
        match self {
            FacetChange::UserPresence(_) => "userPresence",
            FacetChange::UserProfileName(_) => "userProfileName",
            FacetChange::EyeTrackingDeviceStatus(_) => "eyeTrackingDeviceStatus",
            FacetChange::GazeTracking(_) => "gazeTracking",
            FacetChange::ScreenBounds(_) => "screenBounds",
            FacetChange::DisplaySize(_) => "displaySize",
        }
    }
}

/// Point on screen the user is looking at, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GazePointData {
    pub x: f64,
    pub y: f64,
    /// Milliseconds, device clock
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeadRotationFlags {
    pub has_rotation_x: bool,
    pub has_rotation_y: bool,
    pub has_rotation_z: bool,
}

/// Head position (mm) and rotation (radians)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeadPoseData {
    pub timestamp: f64,
    pub head_position: Vector3,
    pub head_rotation: Vector3,
    pub has_head_position: bool,
    pub has_rotation: HeadRotationFlags,
}

/// Eye positions in mm and in the normalized track box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EyePositionData {
    pub timestamp: f64,
    pub left_eye: Vector3,
    pub left_eye_normalized: Vector3,
    pub right_eye: Vector3,
    pub right_eye_normalized: Vector3,
    pub has_left_eye_position: bool,
    pub has_right_eye_position: bool,
}

/// One sample emitted by a device stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamSample {
    GazePoint(GazePointData),
    HeadPose(HeadPoseData),
    EyePosition(EyePositionData),
}

impl StreamSample {
    pub fn kind(&self) -> StreamKind {
        match self {
            StreamSample::GazePoint(_) => StreamKind::GazePoint,
            StreamSample::HeadPose(_) => StreamKind::HeadPose,
            StreamSample::EyePosition(_) => StreamKind::EyePosition,
        }
    }
}
