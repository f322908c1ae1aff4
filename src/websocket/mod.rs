// WebSocket module - Socket abstraction and the tungstenite implementation
pub mod factory;
pub mod transport;

pub use factory::{WebSocketFactory, WebSocketTransport};
pub use transport::{CloseInfo, Connector, EventSink, Transport, TransportEvent};
