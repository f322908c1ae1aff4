use super::FrameType;
use crate::types::{InboundFrame, OnlineStatus};
use serde_json::Value;

/// Where an inbound frame goes after classification
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Server ping, answer with a pong
    Ping { timestamp: Option<i64> },
    /// Answer to one of our pings
    Pong { timestamp: Option<i64> },
    /// Replace the roster with this snapshot
    Roster(OnlineStatus),
    /// Hand to the application untouched
    Forward(Value),
    /// Not structured data, drop it
    Malformed(String),
}

/// Classifies incoming text frames
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameRouter;

impl FrameRouter {
    pub fn new() -> Self {
        Self
    }

    /// Routes a text frame to the appropriate handler
    pub fn route(&self, text: &str) -> Route {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Failed to parse frame: {} - Raw: {}", e, text);
                return Route::Malformed(e.to_string());
            }
        };

        match frame.kind {
            Some(FrameType::Ping) => Route::Ping {
                timestamp: frame.timestamp(),
            },
            Some(FrameType::Pong) => Route::Pong {
                timestamp: frame.timestamp(),
            },
            Some(FrameType::OnlineStatus) => Route::Roster(frame.online_status()),
            Some(ref kind) => {
                tracing::debug!("Forwarding {} frame", kind);
                Route::Forward(frame.raw)
            }
            None => {
                tracing::debug!("Forwarding untyped frame");
                Route::Forward(frame.raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_heartbeat_frames_are_consumed() {
        let router = FrameRouter::new();
        assert_eq!(
            router.route(r#"{"type":"ping","timestamp":10}"#),
            Route::Ping {
                timestamp: Some(10)
            }
        );
        assert_eq!(
            router.route(r#"{"type":"pong","timestamp":20}"#),
            Route::Pong {
                timestamp: Some(20)
            }
        );
        assert_eq!(
            router.route(r#"{"type":"pong"}"#),
            Route::Pong { timestamp: None }
        );
    }

    #[test]
    fn test_roster_frame() {
        let router = FrameRouter::new();
        let Route::Roster(status) = router.route(r#"{"type":"online_status","online_users":["a","b"]}"#)
        else {
            panic!("expected roster route");
        };
        assert_eq!(status.online_users, vec![UserId::from("a"), UserId::from("b")]);
    }

    #[test]
    fn test_business_frames_forward_verbatim() {
        let router = FrameRouter::new();
        for text in [
            r#"{"type":"message","text":"hi"}"#,
            r#"{"type":"typing","user_id":4}"#,
            r#"{"type":"read_receipt","message_id":9}"#,
            r#"{"type":"session_update","id":1}"#,
            r#"{"no_type":true}"#,
        ] {
            let expected: Value = serde_json::from_str(text).unwrap();
            assert_eq!(router.route(text), Route::Forward(expected));
        }
    }

    #[test]
    fn test_malformed_frame() {
        let router = FrameRouter::new();
        assert!(matches!(router.route("{oops"), Route::Malformed(_)));
        assert_eq!(
            router.route(r#""just a string""#),
            Route::Forward(json!("just a string"))
        );
    }
}
