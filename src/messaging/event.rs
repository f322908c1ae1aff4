use crate::types::constants::frame_types;

/// Type-safe frame discriminator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Heartbeat request, answered with a pong
    Ping,

    /// Heartbeat answer
    Pong,

    /// Full replacement of the online roster
    OnlineStatus,

    /// Chat message
    Message,

    /// Typing indicator
    Typing,

    /// Read receipt for a delivered message
    ReadReceipt,

    /// Any type the client has no special handling for
    Other(String),
}

impl FrameType {
    /// Parse a `type` string into a FrameType
    pub fn from_str(s: &str) -> Self {
        match s {
            frame_types::PING => Self::Ping,
            frame_types::PONG => Self::Pong,
            frame_types::ONLINE_STATUS => Self::OnlineStatus,
            frame_types::MESSAGE => Self::Message,
            frame_types::TYPING => Self::Typing,
            frame_types::READ_RECEIPT => Self::ReadReceipt,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Convert to the wire string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ping => frame_types::PING,
            Self::Pong => frame_types::PONG,
            Self::OnlineStatus => frame_types::ONLINE_STATUS,
            Self::Message => frame_types::MESSAGE,
            Self::Typing => frame_types::TYPING,
            Self::ReadReceipt => frame_types::READ_RECEIPT,
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for FrameType {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_from_str() {
        assert_eq!(FrameType::from_str("ping"), FrameType::Ping);
        assert_eq!(FrameType::from_str("online_status"), FrameType::OnlineStatus);
        assert_eq!(FrameType::from_str("read_receipt"), FrameType::ReadReceipt);
        assert_eq!(
            FrameType::from_str("notification"),
            FrameType::Other("notification".to_string())
        );
    }

    #[test]
    fn test_wire_names_survive_parsing() {
        for kind in [
            FrameType::Ping,
            FrameType::Pong,
            FrameType::OnlineStatus,
            FrameType::Message,
            FrameType::Typing,
            FrameType::ReadReceipt,
        ] {
            assert_eq!(FrameType::from_str(kind.as_str()), kind);
        }
    }
}
