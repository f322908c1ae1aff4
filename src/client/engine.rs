use super::builder::ClientConfig;
use super::connection::{ConnectionManager, ConnectionState};
use super::state::{ClientState, Notification, RetryKind};
use crate::infrastructure::{HeartbeatManager, Scheduler, Timer};
use crate::messaging::{FrameRouter, Route};
use crate::types::constants::{
    CLIENT_DROPPED_REASON, HEARTBEAT_TIMEOUT_REASON, MANUAL_DISCONNECT_REASON, RESTART_DELAY,
    WS_CLOSE_NORMAL,
};
use crate::types::{OutboundFrame, RealtimeError, Result, UserId};
use crate::websocket::{CloseInfo, Connector, TransportEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Timers owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Heartbeat,
    Retry(RetryKind),
}

/// Everything that can move the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Event from the socket opened under `generation`
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    /// Timer `id` fired
    Timer { id: u64, kind: TimerKind },
}

/// The reconnecting client as a synchronous state machine.
///
/// Socket events and timer firings arrive as [`Input`]s through the channel
/// handed to [`new`](Self::new) and are applied with [`handle`](Self::handle).
/// Anything the application must hear about is queued and collected with
/// [`take_notifications`](Self::take_notifications).
pub struct ClientEngine {
    config: ClientConfig,
    state: ClientState,
    connection: ConnectionManager,
    heartbeat: HeartbeatManager,
    router: FrameRouter,
    connector: Arc<dyn Connector>,
    scheduler: Arc<dyn Scheduler>,
    inputs: mpsc::UnboundedSender<Input>,
    next_timer_id: u64,
}

impl ClientEngine {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        scheduler: Arc<dyn Scheduler>,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Self {
        let backoff = Timer::new(config.reconnect_delay, config.max_reconnect_attempts);
        let heartbeat = HeartbeatManager::new(config.heartbeat_interval);
        Self {
            config,
            state: ClientState::new(backoff),
            connection: ConnectionManager::new(),
            heartbeat,
            router: FrameRouter::new(),
            connector,
            scheduler,
            inputs,
            next_timer_id: 0,
        }
    }

    /// Opens a socket for the configured user.
    ///
    /// Does nothing without a user id, or while a socket is already opening
    /// or open. A pending backoff timer is cancelled and the reconnect budget
    /// starts over.
    pub fn connect(&mut self) {
        if self.config.user_id.is_none() {
            tracing::debug!("No user id configured, not connecting");
            return;
        }

        if matches!(
            self.state.status(),
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            tracing::debug!("Already connected or connecting");
            return;
        }

        self.state.backoff.reset();
        self.open_socket();
    }

    /// Closes the socket and stops all automatic recovery
    pub fn disconnect(&mut self) {
        self.state.was_manual_disconnect = true;
        self.state.cancel_retry_timer();
        self.heartbeat.stop();

        if self
            .connection
            .close(WS_CLOSE_NORMAL, MANUAL_DISCONNECT_REASON)
        {
            tracing::info!("Disconnected from WebSocket server");
            self.state.notify(Notification::Disconnected(CloseInfo::new(
                WS_CLOSE_NORMAL,
                MANUAL_DISCONNECT_REASON,
            )));
        }

        self.state.set_status(ConnectionState::Disconnected);
    }

    /// Disconnects now and connects again after a short pause
    pub fn reconnect(&mut self) {
        self.disconnect();
        self.arm_retry_timer(RetryKind::Restart, Duration::from_millis(RESTART_DELAY));
    }

    /// Serializes `payload` and sends it if the socket is open
    pub fn try_send<T: Serialize + ?Sized>(&mut self, payload: &T) -> Result<()> {
        if self.state.status() != ConnectionState::Open {
            return Err(RealtimeError::NotConnected);
        }

        let text = serde_json::to_string(payload)?;
        self.connection.send_text(text)
    }

    /// Like [`try_send`](Self::try_send), reporting only success
    pub fn send_message<T: Serialize + ?Sized>(&mut self, payload: &T) -> bool {
        match self.try_send(payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Message not sent: {}", e);
                false
            }
        }
    }

    /// Sends a heartbeat ping if the socket is open
    pub fn send_ping(&mut self) {
        let now = self.scheduler.now_millis();
        if self.try_send(&OutboundFrame::Ping { timestamp: now }).is_ok() {
            self.heartbeat.record_ping(now);
            tracing::debug!("Sent ping at {}", now);
        }
    }

    /// Applies one input to the state machine
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Transport { generation, event } => {
                if !self.connection.is_current(generation) {
                    tracing::debug!(
                        "Ignoring {:?} from superseded connection #{}",
                        event,
                        generation
                    );
                    return;
                }
                match event {
                    TransportEvent::Opened => self.on_open(),
                    TransportEvent::Frame(text) => self.on_frame(&text),
                    TransportEvent::Error(message) => self.on_transport_error(message),
                    TransportEvent::Closed(info) => self.on_close(info),
                }
            }
            Input::Timer { id, kind } => self.on_timer(id, kind),
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.state.take_notifications()
    }

    pub fn status(&self) -> ConnectionState {
        self.state.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe_status()
    }

    pub fn online_users(&self) -> Arc<Vec<UserId>> {
        self.state.roster()
    }

    pub fn subscribe_roster(&self) -> watch::Receiver<Arc<Vec<UserId>>> {
        self.state.subscribe_roster()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.state.backoff.attempts()
    }

    pub fn last_ping_at(&self) -> Option<i64> {
        self.heartbeat.last_ping_at()
    }

    pub fn last_latency(&self) -> Option<i64> {
        self.heartbeat.last_latency()
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.state.retry_timer.is_some()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.config.endpoint.as_deref()
    }

    fn open_socket(&mut self) {
        let Some(endpoint) = self.config.endpoint.clone() else {
            return;
        };

        self.state.cancel_retry_timer();
        self.heartbeat.stop();
        self.connection.discard();
        self.state.was_manual_disconnect = false;
        self.state.clear_roster();

        let generation = self.connection.next_generation();
        let inputs = self.inputs.clone();
        let transport = self.connector.open(
            &endpoint,
            Arc::new(move |event| {
                if inputs.send(Input::Transport { generation, event }).is_err() {
                    tracing::debug!("Client gone, dropping event from connection #{}", generation);
                }
            }),
        );
        self.connection.install(generation, transport);
        self.state.set_status(ConnectionState::Connecting);
        tracing::info!("Connecting to {} (connection #{})", endpoint, generation);
    }

    fn on_open(&mut self) {
        tracing::info!("Connected to WebSocket server");
        self.state.backoff.reset();
        self.state.set_status(ConnectionState::Open);

        let id = self.next_timer_id();
        let inputs = self.inputs.clone();
        self.heartbeat.start(
            self.scheduler.as_ref(),
            id,
            Arc::new(move || {
                let _ = inputs.send(Input::Timer {
                    id,
                    kind: TimerKind::Heartbeat,
                });
            }),
        );

        self.state.notify(Notification::Connected);
    }

    fn on_frame(&mut self, text: &str) {
        match self.router.route(text) {
            Route::Ping { .. } => {
                let now = self.scheduler.now_millis();
                if let Err(e) = self.try_send(&OutboundFrame::Pong { timestamp: now }) {
                    tracing::warn!("Failed to answer ping: {}", e);
                }
            }
            Route::Pong { timestamp } => {
                let now = self.scheduler.now_millis();
                match self.heartbeat.record_pong(now, timestamp) {
                    Some(latency) => tracing::debug!("Ping latency: {}ms", latency),
                    None => tracing::debug!("Received pong without usable timestamp"),
                }
            }
            Route::Roster(status) => {
                if let Some(interval) = status.heartbeat_interval {
                    tracing::debug!("Server heartbeat interval: {}s", interval);
                }
                tracing::debug!("{} users online", status.online_users.len());
                self.state.replace_roster(status.online_users);
            }
            Route::Forward(payload) => self.state.notify(Notification::Message(payload)),
            Route::Malformed(_) => {}
        }
    }

    fn on_transport_error(&mut self, message: String) {
        tracing::error!("WebSocket error: {}", message);
        self.heartbeat.stop();
        self.connection.discard();
        self.state.set_status(ConnectionState::Closed);
        self.state
            .notify(Notification::Error(RealtimeError::Transport(message)));
        self.schedule_reconnect();
    }

    fn on_close(&mut self, info: CloseInfo) {
        tracing::info!("WebSocket disconnected: {} {}", info.code, info.reason);
        self.heartbeat.stop();
        self.connection.discard();
        self.state.set_status(ConnectionState::Closed);
        self.state.notify(Notification::Disconnected(info));

        if !self.state.was_manual_disconnect {
            self.schedule_reconnect();
        }
    }

    fn on_timer(&mut self, id: u64, kind: TimerKind) {
        match kind {
            TimerKind::Heartbeat => {
                if !self.heartbeat.is_current(id) {
                    tracing::debug!("Ignoring stale heartbeat tick #{}", id);
                    return;
                }
                self.on_heartbeat_tick();
            }
            TimerKind::Retry(retry) => {
                let is_current = matches!(
                    self.state.retry_timer,
                    Some((current, current_kind, _)) if current == id && current_kind == retry
                );
                if !is_current {
                    tracing::debug!("Ignoring stale {:?} timer #{}", retry, id);
                    return;
                }
                self.state.retry_timer = None;

                match retry {
                    RetryKind::Backoff => {
                        tracing::info!(
                            attempt = self.state.backoff.attempts(),
                            "Attempting to reconnect..."
                        );
                        self.open_socket();
                    }
                    RetryKind::Restart => self.connect(),
                }
            }
        }
    }

    fn on_heartbeat_tick(&mut self) {
        if self.config.detect_missed_pong && self.heartbeat.missed_pong() {
            tracing::warn!("Heartbeat timeout detected, closing connection");
            self.heartbeat.stop();
            self.connection
                .close(WS_CLOSE_NORMAL, HEARTBEAT_TIMEOUT_REASON);
            self.state.set_status(ConnectionState::Closed);
            self.state
                .notify(Notification::Error(RealtimeError::HeartbeatTimeout));
            self.schedule_reconnect();
            return;
        }

        self.send_ping();
    }

    fn schedule_reconnect(&mut self) {
        if self.state.was_manual_disconnect {
            return;
        }

        match self.state.backoff.next_delay() {
            Some(delay) => {
                tracing::info!(
                    delay_ms = delay.as_millis() as u64,
                    attempt = self.state.backoff.attempts(),
                    "Reconnecting in {}ms",
                    delay.as_millis()
                );
                self.arm_retry_timer(RetryKind::Backoff, delay);
                self.state.set_status(ConnectionState::Reconnecting);
            }
            None => {
                let attempts = self.state.backoff.max_attempts();
                tracing::error!("Max reconnect attempts reached ({})", attempts);
                self.state.cancel_retry_timer();
                self.state.set_status(ConnectionState::Exhausted);
                self.state
                    .notify(Notification::Error(RealtimeError::MaxReconnectAttempts {
                        attempts,
                    }));
            }
        }
    }

    fn arm_retry_timer(&mut self, kind: RetryKind, delay: Duration) {
        self.state.cancel_retry_timer();

        let id = self.next_timer_id();
        let inputs = self.inputs.clone();
        let handle = self.scheduler.schedule_once(
            delay,
            Arc::new(move || {
                let _ = inputs.send(Input::Timer {
                    id,
                    kind: TimerKind::Retry(kind),
                });
            }),
        );
        self.state.retry_timer = Some((id, kind, handle));
    }

    fn next_timer_id(&mut self) -> u64 {
        self.next_timer_id += 1;
        self.next_timer_id
    }
}

impl Drop for ClientEngine {
    fn drop(&mut self) {
        self.state.cancel_retry_timer();
        self.heartbeat.stop();
        if self.connection.close(WS_CLOSE_NORMAL, CLIENT_DROPPED_REASON) {
            tracing::debug!("Client dropped, connection closed");
        }
    }
}
