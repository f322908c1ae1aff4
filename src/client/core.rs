use super::builder::Callbacks;
use super::engine::{ClientEngine, Input};
use super::state::Notification;
use super::{ConnectionState, RealtimeClientBuilder, RealtimeClientOptions};
use crate::types::{OutboundFrame, RealtimeError, Result, UserId};
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, mpsc, watch};

/// Reconnecting client for the per-user realtime messaging socket.
///
/// `RealtimeClient` keeps one socket open for the configured user, sends a
/// heartbeat ping on a fixed interval, answers server pings, tracks the
/// online roster and reconnects with linear backoff when the socket drops.
/// Every other frame is handed to the `on_message` callback untouched.
///
/// # Example
///
/// ```no_run
/// use moodtrack_realtime_rs::{RealtimeClient, RealtimeClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RealtimeClient::builder(RealtimeClientOptions::for_user("42"))
///     .on_message(|frame| println!("received {frame}"))
///     .on_error(|err| eprintln!("realtime error: {err}"))
///     .build()?;
///
/// client.connect().await;
/// // Use the client...
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) engine: Arc<Mutex<ClientEngine>>,
    pub(crate) callbacks: Arc<Callbacks>,
    status_rx: watch::Receiver<ConnectionState>,
    roster_rx: watch::Receiver<Arc<Vec<UserId>>>,
}

impl RealtimeClient {
    /// Creates a client with no callbacks and the default socket and timers.
    ///
    /// This does not open a connection. Call [`connect()`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::UrlParse`] for a malformed endpoint,
    /// [`RealtimeError::InvalidConfig`] for rejected options and
    /// [`RealtimeError::Connection`] when called outside a tokio runtime.
    pub fn new(options: RealtimeClientOptions) -> Result<Self> {
        RealtimeClientBuilder::new(options).build()
    }

    pub fn builder(options: RealtimeClientOptions) -> RealtimeClientBuilder {
        RealtimeClientBuilder::new(options)
    }

    pub(crate) fn start(
        engine: ClientEngine,
        inputs: mpsc::UnboundedReceiver<Input>,
        callbacks: Callbacks,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            RealtimeError::Connection(
                "RealtimeClient must be built inside a tokio runtime".to_string(),
            )
        })?;

        let status_rx = engine.subscribe_status();
        let roster_rx = engine.subscribe_roster();
        let client = Self {
            engine: Arc::new(Mutex::new(engine)),
            callbacks: Arc::new(callbacks),
            status_rx,
            roster_rx,
        };

        runtime.spawn(pump_inputs(
            Arc::downgrade(&client.engine),
            Arc::clone(&client.callbacks),
            inputs,
        ));

        Ok(client)
    }

    /// Opens the socket for the configured user.
    ///
    /// Returns immediately. The outcome is reported through `on_connect` or
    /// `on_error` and the [`state()`](Self::state) watch. Does nothing when
    /// no user id is configured or a socket is already opening or open.
    pub async fn connect(&self) {
        self.with_engine(ClientEngine::connect).await;
    }

    /// Closes the socket with a normal closure and stops automatic
    /// reconnection until the next [`connect()`](Self::connect).
    pub async fn disconnect(&self) {
        self.with_engine(ClientEngine::disconnect).await;
    }

    /// Disconnects, then connects again after a short pause.
    pub async fn reconnect(&self) {
        self.with_engine(ClientEngine::reconnect).await;
    }

    /// Serializes and sends `payload` if the socket is open.
    ///
    /// Returns `false` instead of failing when the frame could not be sent.
    pub async fn send_message<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        self.engine.lock().await.send_message(payload)
    }

    /// Like [`send_message()`](Self::send_message) but says why a send failed.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::NotConnected`] when the socket is not open,
    /// [`RealtimeError::Serialization`] when `payload` cannot be encoded.
    pub async fn try_send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        self.engine.lock().await.try_send(payload)
    }

    /// Sends a heartbeat ping now. No-op when the socket is not open.
    pub async fn send_ping(&self) {
        self.engine.lock().await.send_ping();
    }

    /// Sends a chat message to `recipient_id`
    pub async fn send_chat_message(
        &self,
        recipient_id: impl Into<UserId>,
        content: impl Into<String>,
    ) -> bool {
        self.send_message(&OutboundFrame::Message {
            content: content.into(),
            recipient_id: recipient_id.into(),
        })
        .await
    }

    /// Tells `recipient_id` that the user is typing
    pub async fn send_typing(&self, recipient_id: impl Into<UserId>) -> bool {
        self.send_message(&OutboundFrame::Typing {
            recipient_id: recipient_id.into(),
        })
        .await
    }

    /// Marks every message from `sender_id` as read
    pub async fn send_mark_read(&self, sender_id: impl Into<UserId>) -> bool {
        self.send_message(&OutboundFrame::MarkRead {
            sender_id: sender_id.into(),
        })
        .await
    }

    /// Checks whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.status_rx.borrow().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        *self.status_rx.borrow()
    }

    /// Watch for connection state changes
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.status_rx.clone()
    }

    /// Users the server last reported as online
    pub fn online_users(&self) -> Arc<Vec<UserId>> {
        self.roster_rx.borrow().clone()
    }

    pub fn is_user_online(&self, user_id: &UserId) -> bool {
        self.roster_rx.borrow().contains(user_id)
    }

    /// Watch for roster snapshots
    pub fn roster_changes(&self) -> watch::Receiver<Arc<Vec<UserId>>> {
        self.roster_rx.clone()
    }

    /// Epoch milliseconds of the last ping sent
    pub async fn last_ping_at(&self) -> Option<i64> {
        self.engine.lock().await.last_ping_at()
    }

    /// Round trip of the last answered ping in milliseconds
    pub async fn last_latency(&self) -> Option<i64> {
        self.engine.lock().await.last_latency()
    }

    pub async fn reconnect_attempts(&self) -> u32 {
        self.engine.lock().await.reconnect_attempts()
    }

    async fn with_engine(&self, op: impl FnOnce(&mut ClientEngine)) {
        let notifications = {
            let mut engine = self.engine.lock().await;
            op(&mut *engine);
            engine.take_notifications()
        };
        dispatch(&self.callbacks, notifications);
    }
}

/// Feeds socket events and timer firings into the engine until the client is dropped
async fn pump_inputs(
    engine: Weak<Mutex<ClientEngine>>,
    callbacks: Arc<Callbacks>,
    mut inputs: mpsc::UnboundedReceiver<Input>,
) {
    while let Some(input) = inputs.recv().await {
        let Some(engine) = engine.upgrade() else {
            break;
        };

        let notifications = {
            let mut engine = engine.lock().await;
            engine.handle(input);
            engine.take_notifications()
        };
        drop(engine);

        dispatch(&callbacks, notifications);
    }
    tracing::debug!("Input pump finished");
}

/// Runs the application callbacks outside the engine lock
fn dispatch(callbacks: &Callbacks, notifications: Vec<Notification>) {
    for notification in notifications {
        match notification {
            Notification::Message(payload) => {
                if let Some(on_message) = &callbacks.on_message {
                    on_message(payload);
                }
            }
            Notification::Connected => {
                if let Some(on_connect) = &callbacks.on_connect {
                    on_connect();
                }
            }
            Notification::Disconnected(info) => {
                if let Some(on_disconnect) = &callbacks.on_disconnect {
                    on_disconnect(&info);
                }
            }
            Notification::Error(error) => {
                if let Some(on_error) = &callbacks.on_error {
                    on_error(&error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{ManualScheduler, Scheduler};
    use crate::test_support::MockConnector;
    use crate::websocket::CloseInfo;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded {
        messages: StdMutex<Vec<Value>>,
        connects: StdMutex<usize>,
        disconnects: StdMutex<Vec<CloseInfo>>,
        errors: StdMutex<Vec<String>>,
    }

    struct Fixture {
        client: RealtimeClient,
        connector: MockConnector,
        scheduler: Arc<ManualScheduler>,
        recorded: Arc<Recorded>,
    }

    fn fixture(options: RealtimeClientOptions) -> Fixture {
        let connector = MockConnector::new();
        let scheduler = Arc::new(ManualScheduler::new(1_000));
        let recorded = Arc::new(Recorded::default());

        let (r1, r2, r3, r4) = (
            Arc::clone(&recorded),
            Arc::clone(&recorded),
            Arc::clone(&recorded),
            Arc::clone(&recorded),
        );
        let client = RealtimeClient::builder(options)
            .connector(Arc::new(connector.clone()))
            .scheduler(Arc::clone(&scheduler) as Arc<dyn Scheduler>)
            .on_message(move |frame| r1.messages.lock().unwrap().push(frame))
            .on_connect(move || *r2.connects.lock().unwrap() += 1)
            .on_disconnect(move |info| r3.disconnects.lock().unwrap().push(info.clone()))
            .on_error(move |err| r4.errors.lock().unwrap().push(err.to_string()))
            .build()
            .unwrap();

        Fixture {
            client,
            connector,
            scheduler,
            recorded,
        }
    }

    /// Lets the input pump drain the channel
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_callbacks_fire_through_pump() {
        let f = fixture(RealtimeClientOptions::for_user("5"));
        f.client.connect().await;
        assert_eq!(f.client.state(), ConnectionState::Connecting);

        f.connector.last().accept();
        settle().await;
        assert!(f.client.is_connected());
        assert_eq!(*f.recorded.connects.lock().unwrap(), 1);

        f.connector
            .last()
            .receive_json(json!({"type": "message", "text": "hi"}));
        f.connector
            .last()
            .receive_json(json!({"type": "online_status", "online_users": [1, "b"]}));
        settle().await;
        assert_eq!(
            *f.recorded.messages.lock().unwrap(),
            vec![json!({"type": "message", "text": "hi"})]
        );
        assert!(f.client.is_user_online(&UserId::from(1)));
        assert_eq!(f.client.online_users().len(), 2);
    }

    #[tokio::test]
    async fn test_callback_may_send_without_deadlock() {
        let connector = MockConnector::new();
        let slot: Arc<StdMutex<Option<RealtimeClient>>> = Arc::new(StdMutex::new(None));
        let slot_cb = Arc::clone(&slot);

        let client = RealtimeClient::builder(RealtimeClientOptions::for_user("5"))
            .connector(Arc::new(connector.clone()))
            .scheduler(Arc::new(ManualScheduler::default()))
            .on_connect(move || {
                let Some(client) = slot_cb.lock().unwrap().clone() else {
                    return;
                };
                tokio::spawn(async move {
                    client.send_typing("9").await;
                });
            })
            .build()
            .unwrap();
        *slot.lock().unwrap() = Some(client.clone());

        client.connect().await;
        connector.last().accept();
        settle().await;

        assert_eq!(
            connector.last().sent_json(),
            vec![json!({"type": "typing", "recipient_id": 9})]
        );
        slot.lock().unwrap().take();
    }

    #[tokio::test]
    async fn test_exhaustion_reported_through_on_error() {
        let f = fixture(RealtimeClientOptions {
            max_reconnect_attempts: Some(1),
            ..RealtimeClientOptions::for_user("5")
        });
        f.client.connect().await;
        f.connector.last().accept();
        f.connector.last().drop_with(1006, "");
        settle().await;
        assert_eq!(f.client.state(), ConnectionState::Reconnecting);
        assert_eq!(f.client.reconnect_attempts().await, 1);

        f.scheduler.advance(Duration::from_millis(3_000));
        settle().await;
        f.connector.last().drop_with(1006, "");
        settle().await;

        assert_eq!(f.client.state(), ConnectionState::Exhausted);
        assert_eq!(
            *f.recorded.errors.lock().unwrap(),
            vec!["Max reconnect attempts reached (1)".to_string()]
        );
        assert_eq!(f.recorded.disconnects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_helpers_and_manual_disconnect() {
        let f = fixture(RealtimeClientOptions::for_user("5"));
        assert!(!f.client.send_chat_message("2", "hello").await);

        f.client.connect().await;
        f.connector.last().accept();
        settle().await;

        assert!(f.client.send_chat_message("2", "hello").await);
        assert!(f.client.send_mark_read("2").await);
        assert_eq!(
            f.connector.last().sent_json(),
            vec![
                json!({"type": "message", "content": "hello", "recipient_id": 2}),
                json!({"type": "mark_read", "sender_id": 2}),
            ]
        );

        f.client.disconnect().await;
        assert_eq!(f.client.state(), ConnectionState::Disconnected);
        assert_eq!(
            *f.recorded.disconnects.lock().unwrap(),
            vec![CloseInfo::new(1000, "Manual disconnect")]
        );
        assert!(matches!(
            f.client.try_send(&json!({"type": "typing"})).await,
            Err(RealtimeError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_state_watch_and_latency() {
        let f = fixture(RealtimeClientOptions::for_user("5"));
        let mut changes = f.client.state_changes();

        f.client.connect().await;
        f.connector.last().accept();
        settle().await;
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), ConnectionState::Open);

        f.client.send_ping().await;
        assert_eq!(f.client.last_ping_at().await, Some(1_000));
        f.scheduler.advance(Duration::from_millis(12));
        f.connector
            .last()
            .receive_json(json!({"type": "pong", "timestamp": 1_000}));
        settle().await;
        assert_eq!(f.client.last_latency().await, Some(12));
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = RealtimeClient::new(RealtimeClientOptions::for_user("5"));
        assert!(matches!(result, Err(RealtimeError::Connection(_))));
    }
}
