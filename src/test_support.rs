//! In-memory sockets for driving the client without a network.

use crate::types::{RealtimeError, Result};
use crate::websocket::{CloseInfo, Connector, EventSink, Transport, TransportEvent};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Test-side view of one socket opened through [`MockConnector`]
#[derive(Clone)]
pub struct MockSocket {
    pub url: String,
    sink: EventSink,
    open: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockSocket {
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Completes the handshake
    pub fn accept(&self) {
        self.set_open(true);
        (self.sink)(TransportEvent::Opened);
    }

    /// Delivers a text frame from the server
    pub fn receive(&self, text: &str) {
        (self.sink)(TransportEvent::Frame(text.to_string()));
    }

    pub fn receive_json(&self, value: Value) {
        self.receive(&value.to_string());
    }

    /// Simulates the peer closing the socket
    pub fn drop_with(&self, code: u16, reason: &str) {
        self.set_open(false);
        (self.sink)(TransportEvent::Closed(CloseInfo::new(code, reason)));
    }

    /// Simulates a connect or read failure
    pub fn fail(&self, message: &str) {
        self.set_open(false);
        (self.sink)(TransportEvent::Error(message.to_string()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn closed_with(&self) -> Option<(u16, String)> {
        self.closed_with.lock().unwrap().clone()
    }
}

struct MockTransport {
    open: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<(u16, String)>>>,
}

impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send_text(&mut self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&mut self, code: u16, reason: &str) {
        self.open.store(false, Ordering::SeqCst);
        *self.closed_with.lock().unwrap() = Some((code, reason.to_string()));
    }
}

/// Connector recording every socket it opens
#[derive(Clone, Default)]
pub struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sockets opened so far
    pub fn opened(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    pub fn socket(&self, index: usize) -> MockSocket {
        self.sockets.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> MockSocket {
        self.sockets
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no socket opened yet")
    }
}

impl Connector for MockConnector {
    fn open(&self, url: &str, sink: EventSink) -> Box<dyn Transport> {
        let socket = MockSocket {
            url: url.to_string(),
            sink,
            open: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed_with: Arc::new(Mutex::new(None)),
        };
        let transport = MockTransport {
            open: Arc::clone(&socket.open),
            sent: Arc::clone(&socket.sent),
            closed_with: Arc::clone(&socket.closed_with),
        };
        self.sockets.lock().unwrap().push(socket);
        Box::new(transport)
    }
}
