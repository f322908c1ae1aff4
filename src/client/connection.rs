use crate::types::{RealtimeError, Result};
use crate::websocket::Transport;

/// Lifecycle of the realtime connection as seen by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Idle,
    /// Socket opened, handshake pending
    Connecting,
    /// Handshake done, heartbeat running
    Open,
    /// Dropped by the peer or the network
    Closed,
    /// Waiting out the backoff delay before the next attempt
    Reconnecting,
    /// Reconnect budget used up
    Exhausted,
    /// Closed on request, no automatic recovery
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Owns the current socket and the generation it was opened under.
///
/// Every socket gets a fresh generation. Events tagged with an older
/// generation come from a superseded socket and must be ignored.
pub struct ConnectionManager {
    transport: Option<Box<dyn Transport>>,
    generation: u64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            transport: None,
            generation: 0,
        }
    }

    /// Retires the current generation and returns the next one
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Installs the socket opened under `generation`
    pub fn install(&mut self, generation: u64, transport: Box<dyn Transport>) {
        debug_assert_eq!(generation, self.generation);
        self.transport = Some(transport);
    }

    /// Whether events from `generation` still concern the live socket
    pub fn is_current(&self, generation: u64) -> bool {
        self.transport.is_some() && generation == self.generation
    }

    /// Sends a text frame through the live socket
    pub fn send_text(&mut self, text: String) -> Result<()> {
        match self.transport.as_mut() {
            Some(transport) if transport.is_open() => transport.send_text(text),
            _ => Err(RealtimeError::NotConnected),
        }
    }

    /// Closes the socket with a close handshake. Returns false if there was none.
    pub fn close(&mut self, code: u16, reason: &str) -> bool {
        match self.transport.take() {
            Some(mut transport) => {
                transport.close(code, reason);
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Drops a socket that already failed, without a close handshake
    pub fn discard(&mut self) {
        if self.transport.take().is_some() {
            self.generation += 1;
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
