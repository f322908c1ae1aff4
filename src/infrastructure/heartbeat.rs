use super::scheduler::{Scheduler, TimerCallback, TimerHandle};
use crate::types::constants::HEARTBEAT_INTERVAL;
use std::time::Duration;

/// Ping cadence and liveness bookkeeping for one client.
///
/// Owns at most one interval timer. Starting a new heartbeat cancels the
/// previous one.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval: Duration,
    timer: Option<(u64, TimerHandle)>,
    last_ping_at: Option<i64>,
    awaiting_pong: bool,
    last_latency: Option<i64>,
}

impl HeartbeatManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: None,
            last_ping_at: None,
            awaiting_pong: false,
            last_latency: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms the interval timer under `id`, replacing any running one
    pub fn start(&mut self, scheduler: &dyn Scheduler, id: u64, on_tick: TimerCallback) {
        self.stop();
        self.awaiting_pong = false;
        let handle = scheduler.schedule_interval(self.interval, on_tick);
        self.timer = Some((id, handle));
        tracing::debug!("Heartbeat started every {:?}", self.interval);
    }

    /// Cancels the interval timer, if any
    pub fn stop(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.cancel();
            tracing::debug!("Heartbeat stopped");
        }
        self.awaiting_pong = false;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether `id` names the currently armed timer
    pub fn is_current(&self, id: u64) -> bool {
        matches!(self.timer, Some((current, _)) if current == id)
    }

    /// Records a ping sent at `now`
    pub fn record_ping(&mut self, now: i64) {
        self.last_ping_at = Some(now);
        self.awaiting_pong = true;
    }

    /// Records a pong echoing `timestamp`, returning the latency in ms.
    ///
    /// A timestamp in the future or too far in the past yields no latency.
    pub fn record_pong(&mut self, now: i64, timestamp: Option<i64>) -> Option<i64> {
        self.awaiting_pong = false;
        let latency = timestamp
            .and_then(|ts| now.checked_sub(ts))
            .filter(|latency| *latency >= 0);
        if latency.is_some() {
            self.last_latency = latency;
        }
        latency
    }

    /// True when the previous ping is still unanswered
    pub fn missed_pong(&self) -> bool {
        self.awaiting_pong
    }

    pub fn last_ping_at(&self) -> Option<i64> {
        self.last_ping_at
    }

    pub fn last_latency(&self) -> Option<i64> {
        self.last_latency
    }
}

impl Default for HeartbeatManager {
    fn default() -> Self {
        Self::new(Duration::from_millis(HEARTBEAT_INTERVAL))
    }
}
