use crate::messaging::FrameType;
use crate::types::constants::frame_fields;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Identifier of a user on the messaging server.
///
/// The server reports numeric ids, clients usually carry them around as
/// strings. Both forms are accepted on the wire. Ids in canonical integer
/// form are written back as numbers so the server can match them against its
/// own keys; anything else (`"007"`, `"+5"`) stays a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id from a loose JSON value. Strings and numbers are
    /// accepted, anything else is not an id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    fn as_canonical_int(&self) -> Option<i64> {
        self.0
            .parse::<i64>()
            .ok()
            .filter(|n| n.to_string() == self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_canonical_int() {
            Some(n) => serializer.serialize_i64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            UInt(u64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::UInt(n) => Self(n.to_string()),
            Raw::Str(s) => Self(s),
        })
    }
}

/// Frames the client writes to the socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Ping { timestamp: i64 },
    Pong { timestamp: i64 },
    Message { content: String, recipient_id: UserId },
    Typing { recipient_id: UserId },
    MarkRead { sender_id: UserId },
}

/// A structured frame received from the socket.
///
/// The raw JSON value is kept untouched so it can be handed to the
/// application verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub kind: Option<FrameType>,
    pub raw: Value,
}

impl InboundFrame {
    /// Parses a text frame. Fails only when the text is not JSON at all.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        let kind = raw
            .get(frame_fields::TYPE)
            .and_then(Value::as_str)
            .map(FrameType::from_str);
        Ok(Self { kind, raw })
    }

    /// Timestamp carried by ping/pong frames, in milliseconds.
    ///
    /// Accepts integer and float encodings.
    pub fn timestamp(&self) -> Option<i64> {
        let ts = self.raw.get(frame_fields::TIMESTAMP)?;
        ts.as_i64().or_else(|| ts.as_f64().map(|f| f as i64))
    }

    /// Decodes the payload of an `online_status` frame.
    ///
    /// A missing user list decodes as empty. Entries that are not ids are
    /// skipped, the rest of the list is kept.
    pub fn online_status(&self) -> OnlineStatus {
        let online_users = self
            .raw
            .get(frame_fields::ONLINE_USERS)
            .and_then(Value::as_array)
            .map(|users| users.iter().filter_map(UserId::from_json).collect())
            .unwrap_or_default();

        OnlineStatus {
            online_users,
            heartbeat_interval: self.raw.get(frame_fields::HEARTBEAT_INTERVAL).cloned(),
        }
    }
}

/// Payload of an `online_status` frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlineStatus {
    pub online_users: Vec<UserId>,
    /// Server heartbeat cadence, informational only
    pub heartbeat_interval: Option<Value>,
}
