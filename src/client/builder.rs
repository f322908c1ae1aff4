use super::RealtimeClient;
use super::engine::ClientEngine;
use crate::infrastructure::{Scheduler, TokioScheduler};
use crate::types::constants::{
    DEFAULT_BASE_URL, HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS, MESSAGES_WS_PATH,
    RECONNECT_DELAY,
};
use crate::types::{RealtimeError, Result, UserId};
use crate::websocket::{CloseInfo, Connector, WebSocketFactory};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Client options. Durations are in milliseconds.
///
/// Deserializable so it can sit inside a host application's config file;
/// every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RealtimeClientOptions {
    /// Identity the socket is opened for. Without it `connect()` does nothing.
    pub user_id: Option<String>,
    /// Full endpoint override
    pub url: Option<String>,
    /// Server base used to derive the per-user endpoint
    pub base_url: Option<String>,
    pub heartbeat_interval: Option<u64>,
    pub reconnect_delay: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
    /// Treat a ping left unanswered for a whole interval as a dead socket
    pub detect_missed_pong: bool,
}

impl RealtimeClientOptions {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }
}

/// Options after defaults and validation
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_id: Option<UserId>,
    pub endpoint: Option<String>,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub detect_missed_pong: bool,
}

impl ClientConfig {
    pub fn from_options(options: &RealtimeClientOptions) -> Result<Self> {
        let user_id = options
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(UserId::from);

        let heartbeat_interval = options.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL);
        if heartbeat_interval == 0 {
            return Err(RealtimeError::InvalidConfig(
                "heartbeat_interval must be greater than zero".to_string(),
            ));
        }

        let endpoint = match (&options.url, &user_id) {
            (Some(url), _) => Some(Url::parse(url)?.to_string()),
            (None, Some(user_id)) => {
                let base = options.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                Some(build_endpoint_url(base, user_id)?)
            }
            (None, None) => None,
        };

        Ok(Self {
            user_id,
            endpoint,
            heartbeat_interval: Duration::from_millis(heartbeat_interval),
            reconnect_delay: Duration::from_millis(
                options.reconnect_delay.unwrap_or(RECONNECT_DELAY),
            ),
            max_reconnect_attempts: options
                .max_reconnect_attempts
                .unwrap_or(MAX_RECONNECT_ATTEMPTS),
            detect_missed_pong: options.detect_missed_pong,
        })
    }
}

/// Build the per-user messaging endpoint.
///
/// The user id becomes a single percent-encoded path segment.
fn build_endpoint_url(base: &str, user_id: &UserId) -> Result<String> {
    if matches!(user_id.as_str(), "." | "..") {
        return Err(RealtimeError::InvalidConfig(format!(
            "user id '{user_id}' is not a valid path segment"
        )));
    }

    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| RealtimeError::InvalidConfig(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(MESSAGES_WS_PATH.split('/').filter(|s| !s.is_empty()))
        .push(user_id.as_str());
    Ok(url.to_string())
}

pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync + 'static>;
pub type ConnectCallback = Arc<dyn Fn() + Send + Sync + 'static>;
pub type DisconnectCallback = Arc<dyn Fn(&CloseInfo) + Send + Sync + 'static>;
pub type ErrorCallback = Arc<dyn Fn(&RealtimeError) + Send + Sync + 'static>;

/// Application hooks. Each one is optional.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_message: Option<MessageCallback>,
    pub on_connect: Option<ConnectCallback>,
    pub on_disconnect: Option<DisconnectCallback>,
    pub on_error: Option<ErrorCallback>,
}

/// Builder for RealtimeClient that handles initialization
pub struct RealtimeClientBuilder {
    options: RealtimeClientOptions,
    callbacks: Callbacks,
    connector: Option<Arc<dyn Connector>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl RealtimeClientBuilder {
    /// Create a new builder
    pub fn new(options: RealtimeClientOptions) -> Self {
        Self {
            options,
            callbacks: Callbacks::default(),
            connector: None,
            scheduler: None,
        }
    }

    pub fn on_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.callbacks.on_message = Some(Arc::new(callback));
        self
    }

    pub fn on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.on_connect = Some(Arc::new(callback));
        self
    }

    pub fn on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CloseInfo) + Send + Sync + 'static,
    {
        self.callbacks.on_disconnect = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RealtimeError) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(callback));
        self
    }

    /// Replaces the tungstenite socket factory
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replaces the tokio clock and timers
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Build the client and spawn its event pump.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<RealtimeClient> {
        let config = ClientConfig::from_options(&self.options)?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketFactory::new()));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new()));

        let (inputs_tx, inputs_rx) = tokio::sync::mpsc::unbounded_channel();
        let engine = ClientEngine::new(config, connector, scheduler, inputs_tx);

        RealtimeClient::start(engine, inputs_rx, self.callbacks)
    }
}
