/// Frame `type` discriminator strings (magic strings layer)
pub mod frame_types {
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ONLINE_STATUS: &str = "online_status";
    pub const MESSAGE: &str = "message";
    pub const TYPING: &str = "typing";
    pub const READ_RECEIPT: &str = "read_receipt";
}

/// Frame field names
pub mod frame_fields {
    pub const TYPE: &str = "type";
    pub const TIMESTAMP: &str = "timestamp";
    pub const ONLINE_USERS: &str = "online_users";
    pub const HEARTBEAT_INTERVAL: &str = "heartbeat_interval";
}

/// Default server base URL used when only a user id is configured
pub const DEFAULT_BASE_URL: &str = "ws://localhost:8000";

/// Per-user messaging socket path, the user id is appended
pub const MESSAGES_WS_PATH: &str = "/api/messages/ws/";

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30_000;

/// Default base reconnect delay (milliseconds), scaled by attempt number
pub const RECONNECT_DELAY: u64 = 3_000;

/// Default maximum number of automatic reconnect attempts
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Pause between teardown and reopen for an explicit reconnect (milliseconds)
pub const RESTART_DELAY: u64 = 100;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;

/// Close reasons sent with a normal closure
pub const MANUAL_DISCONNECT_REASON: &str = "Manual disconnect";
pub const CLIENT_DROPPED_REASON: &str = "Client dropped";
pub const HEARTBEAT_TIMEOUT_REASON: &str = "Heartbeat timeout";
