use super::connection::ConnectionState;
use crate::infrastructure::{Timer, TimerHandle};
use crate::types::{RealtimeError, UserId};
use crate::websocket::CloseInfo;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// What the application gets told about
#[derive(Debug)]
pub enum Notification {
    Message(Value),
    Connected,
    Disconnected(CloseInfo),
    Error(RealtimeError),
}

/// Why a one-shot timer in the reconnect slot was armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// Automatic attempt after backoff
    Backoff,
    /// Reopen after an explicit `reconnect()`
    Restart,
}

/// Consolidated mutable state for the client engine
pub struct ClientState {
    /// Reconnect budget and backoff
    pub backoff: Timer,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// At most one pending reconnect or restart timer
    pub retry_timer: Option<(u64, RetryKind, TimerHandle)>,

    status_tx: watch::Sender<ConnectionState>,
    roster_tx: watch::Sender<Arc<Vec<UserId>>>,
    notifications: Vec<Notification>,
}

impl ClientState {
    pub fn new(backoff: Timer) -> Self {
        let (status_tx, _) = watch::channel(ConnectionState::Idle);
        let (roster_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            backoff,
            was_manual_disconnect: false,
            retry_timer: None,
            status_tx,
            roster_tx,
            notifications: Vec::new(),
        }
    }

    pub fn status(&self) -> ConnectionState {
        *self.status_tx.borrow()
    }

    /// Publishes a new status, waking watchers only on change
    pub fn set_status(&self, status: ConnectionState) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::debug!("Connection state {:?} -> {:?}", current, status);
            *current = status;
            true
        });
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    pub fn roster(&self) -> Arc<Vec<UserId>> {
        self.roster_tx.borrow().clone()
    }

    /// Swaps in a new roster snapshot
    pub fn replace_roster(&self, users: Vec<UserId>) {
        self.roster_tx.send_replace(Arc::new(users));
    }

    pub fn clear_roster(&self) {
        self.roster_tx.send_if_modified(|current| {
            if current.is_empty() {
                return false;
            }
            *current = Arc::new(Vec::new());
            true
        });
    }

    pub fn subscribe_roster(&self) -> watch::Receiver<Arc<Vec<UserId>>> {
        self.roster_tx.subscribe()
    }

    /// Cancels the pending reconnect or restart timer, if any
    pub fn cancel_retry_timer(&mut self) {
        if let Some((_, kind, handle)) = self.retry_timer.take() {
            handle.cancel();
            tracing::debug!("Cancelled pending {:?} timer", kind);
        }
    }

    /// Queue a notification for the application
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new(Timer::default())
    }
}
