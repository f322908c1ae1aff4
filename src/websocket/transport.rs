use crate::types::Result;
use std::sync::Arc;

/// Close code and reason reported when a socket goes away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Everything a socket can report back to the client
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake completed, the socket accepts frames
    Opened,
    /// A text frame arrived
    Frame(String),
    /// Connect or read failure
    Error(String),
    /// The socket was closed by the peer or the network
    Closed(CloseInfo),
}

/// Receives the events of one socket
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync + 'static>;

/// One live socket, exclusively owned by the client
pub trait Transport: Send {
    /// True once the handshake completed and until the socket closes
    fn is_open(&self) -> bool;

    /// Queues a text frame for sending
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Starts a close handshake with the given code and reason
    fn close(&mut self, code: u16, reason: &str);
}

/// Opens sockets. Must not block: the outcome arrives through the sink.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str, sink: EventSink) -> Box<dyn Transport>;
}
