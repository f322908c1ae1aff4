// Module declarations
mod builder;
mod connection;
mod core;
mod engine;
mod state;

// Public API exports
pub use builder::{
    Callbacks, ClientConfig, ConnectCallback, DisconnectCallback, ErrorCallback, MessageCallback,
    RealtimeClientBuilder, RealtimeClientOptions,
};
pub use connection::{ConnectionManager, ConnectionState};
pub use core::RealtimeClient;
pub use engine::{ClientEngine, Input, TimerKind};
pub use state::{ClientState, Notification, RetryKind};
