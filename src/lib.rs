//! # MoodTrack Realtime
//!
//! Reconnecting client for the MoodTrack per-user messaging socket.
//!
//! The client keeps a WebSocket open for one user, exchanges `ping`/`pong`
//! heartbeats, mirrors the server's online roster and reconnects with linear
//! backoff when the connection drops. Chat frames (`message`, `typing`,
//! `read_receipt`, ...) are handed to the application untouched.
//!
//! ## Example
//!
//! ```no_run
//! use moodtrack_realtime_rs::{RealtimeClient, RealtimeClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RealtimeClient::builder(RealtimeClientOptions::for_user("42"))
//!         .on_message(|frame| println!("{frame}"))
//!         .build()?;
//!
//!     client.connect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ConnectionState, RealtimeClient, RealtimeClientBuilder, RealtimeClientOptions};
pub use infrastructure::{ManualScheduler, Scheduler, TokioScheduler};
pub use messaging::FrameType;
pub use types::{OutboundFrame, RealtimeError, Result, UserId};
pub use websocket::{CloseInfo, Connector, Transport, TransportEvent};
