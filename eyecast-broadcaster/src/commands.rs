//! Inbound client commands

use eyecast_device::StreamKind;

/// Command sent by a client as a text frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Reply with the current device state
    State,
    Start(StreamKind),
    Stop(StreamKind),
}

impl ClientCommand {
    /// Exact, case-sensitive match. Unknown text yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "state" => Some(Self::State),
            "startGazePoint" => Some(Self::Start(StreamKind::GazePoint)),
            "startHeadPose" => Some(Self::Start(StreamKind::HeadPose)),
            "startEyePosition" => Some(Self::Start(StreamKind::EyePosition)),
            "stopGazePoint" => Some(Self::Stop(StreamKind::GazePoint)),
            "stopHeadPose" => Some(Self::Stop(StreamKind::HeadPose)),
            "stopEyePosition" => Some(Self::Stop(StreamKind::EyePosition)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(ClientCommand::parse("state"), Some(ClientCommand::State));
        assert_eq!(
            ClientCommand::parse("startHeadPose"),
            Some(ClientCommand::Start(StreamKind::HeadPose))
        );
        assert_eq!(
            ClientCommand::parse("stopEyePosition"),
            Some(ClientCommand::Stop(StreamKind::EyePosition))
        );
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(ClientCommand::parse("foo"), None);
        assert_eq!(ClientCommand::parse("State"), None);
        assert_eq!(ClientCommand::parse("startgazepoint"), None);
        assert_eq!(ClientCommand::parse(" state"), None);
        assert_eq!(ClientCommand::parse("state\n"), None);
        assert_eq!(ClientCommand::parse(""), None);
    }
}
