use super::transport::{CloseInfo, Connector, EventSink, Transport, TransportEvent};
use crate::infrastructure::TaskManager;
use crate::types::constants::WS_CLOSE_ABNORMAL;
use crate::types::{RealtimeError, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// WebSocket factory for creating tungstenite-backed connections
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketFactory;

impl WebSocketFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketFactory {
    fn open(&self, url: &str, sink: EventSink) -> Box<dyn Transport> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let mut tasks = TaskManager::new();

        let spawned = tasks.spawn(drive_socket(
            url.to_string(),
            Arc::clone(&sink),
            out_rx,
            Arc::clone(&open),
        ));
        if !spawned {
            sink(TransportEvent::Error(
                "No tokio runtime available to drive the socket".to_string(),
            ));
        }

        Box::new(WebSocketTransport {
            out_tx,
            open,
            tasks,
            close_requested: false,
        })
    }
}

/// Write half of a socket driven by a background task
pub struct WebSocketTransport {
    out_tx: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
    tasks: TaskManager,
    close_requested: bool,
}

impl Transport for WebSocketTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send_text(&mut self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }

        self.out_tx
            .send(Message::Text(text.into()))
            .map_err(|_| RealtimeError::Transport("socket task has stopped".to_string()))
    }

    fn close(&mut self, code: u16, reason: &str) {
        self.open.store(false, Ordering::SeqCst);
        if self.close_requested {
            return;
        }
        self.close_requested = true;

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        if self.out_tx.send(Message::Close(Some(frame))).is_err() {
            tracing::debug!("Socket task already stopped, close frame not sent");
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if self.close_requested {
            // Let the task flush the close frame on its own
            tracing::debug!("Detaching {} socket task(s)", self.tasks.running());
            self.tasks.detach_all();
        }
    }
}

async fn drive_socket(
    url: String,
    sink: EventSink,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
    open: Arc<AtomicBool>,
) {
    tracing::info!("Connecting to {}", url);
    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            tracing::error!("WebSocket connect failed: {}", e);
            sink(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    sink(TransportEvent::Opened);

    let (mut write_half, mut read_half) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => match outgoing {
                Some(message) => {
                    if let Err(e) = write_half.send(message).await {
                        tracing::error!("WebSocket write error: {}", e);
                        open.store(false, Ordering::SeqCst);
                        sink(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    // Handle dropped without a close handshake
                    let _ = write_half.close().await;
                    open.store(false, Ordering::SeqCst);
                    break;
                }
            },
            incoming = read_half.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Received text frame: {}", text.as_str());
                    sink(TransportEvent::Frame(text.as_str().to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    open.store(false, Ordering::SeqCst);
                    let info = match frame {
                        Some(close_frame) => {
                            tracing::warn!(
                                "Server closed connection: code={:?}, reason='{}'",
                                close_frame.code,
                                close_frame.reason.as_str()
                            );
                            CloseInfo::new(u16::from(close_frame.code), close_frame.reason.as_str())
                        }
                        None => {
                            tracing::warn!("Server closed connection without close frame");
                            CloseInfo::new(WS_CLOSE_ABNORMAL, "")
                        }
                    };
                    sink(TransportEvent::Closed(info));
                    break;
                }
                Some(Ok(Message::Ping(data))) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Some(Ok(Message::Pong(data))) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                }
                Some(Ok(Message::Frame(_))) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    open.store(false, Ordering::SeqCst);
                    sink(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    open.store(false, Ordering::SeqCst);
                    sink(TransportEvent::Closed(CloseInfo::new(WS_CLOSE_ABNORMAL, "stream ended")));
                    break;
                }
            },
        }
    }

    tracing::info!("Socket task finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_open_without_runtime_reports_error() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        let mut transport = WebSocketFactory::new().open(
            "ws://localhost:1/api/messages/ws/1",
            Arc::new(move |event| recorded.lock().unwrap().push(event)),
        );

        assert!(!transport.is_open());
        assert!(matches!(
            transport.send_text("{}".to_string()),
            Err(RealtimeError::NotConnected)
        ));
        let events = events.lock().unwrap();
        assert!(matches!(events.as_slice(), [TransportEvent::Error(_)]));
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _transport = WebSocketFactory::new().open(
            "ws://127.0.0.1:1/api/messages/ws/1",
            Arc::new(move |event| {
                let _ = tx.send(event);
            }),
        );

        let event = rx.recv().await;
        assert!(matches!(event, Some(TransportEvent::Error(_))));
    }
}
