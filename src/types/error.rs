use thiserror::Error;

/// Errors that can occur when using the realtime client.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport failure reported by the live socket (read error, abrupt drop)
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Reconnect budget used up, no further automatic attempts are made
    #[error("Max reconnect attempts reached ({attempts})")]
    MaxReconnectAttempts { attempts: u32 },

    /// A ping went unanswered for a full heartbeat interval
    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// Rejected client options
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RealtimeError {
    /// Returns true when the client has stopped recovering on its own and
    /// needs an explicit `connect()` or `reconnect()` to resume.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MaxReconnectAttempts { .. })
    }
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exhaustion_is_terminal() {
        assert!(RealtimeError::MaxReconnectAttempts { attempts: 5 }.is_terminal());
        assert!(!RealtimeError::Transport("reset".to_string()).is_terminal());
        assert!(!RealtimeError::HeartbeatTimeout.is_terminal());
        assert!(!RealtimeError::NotConnected.is_terminal());
    }

    #[test]
    fn test_exhaustion_message_names_attempts() {
        let err = RealtimeError::MaxReconnectAttempts { attempts: 2 };
        assert_eq!(err.to_string(), "Max reconnect attempts reached (2)");
    }
}
