use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{self, MissedTickBehavior};

/// Callback run when a timer fires
pub type TimerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Clock and timer source used by the client.
///
/// Production code runs on [`TokioScheduler`]; tests drive time by hand with
/// [`ManualScheduler`].
pub trait Scheduler: Send + Sync + 'static {
    /// Current wall-clock time in epoch milliseconds
    fn now_millis(&self) -> i64;

    /// Runs `callback` once after `delay`
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Runs `callback` every `period`, first firing one period from now
    fn schedule_interval(&self, period: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Owned handle to a scheduled timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<AbortHandle>,
}

impl TimerHandle {
    fn new(cancelled: Arc<AtomicBool>, task: Option<AbortHandle>) -> Self {
        Self { cancelled, task }
    }

    /// A handle for a timer that will never fire
    pub fn inert() -> Self {
        Self::new(Arc::new(AtomicBool::new(true)), None)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler backed by the tokio timer wheel and the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("No tokio runtime available, timer not scheduled");
            return TimerHandle::inert();
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let task = runtime.spawn(async move {
            time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                callback();
            }
        });

        TimerHandle::new(cancelled, Some(task.abort_handle()))
    }

    fn schedule_interval(&self, period: Duration, callback: TimerCallback) -> TimerHandle {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("No tokio runtime available, interval not scheduled");
            return TimerHandle::inert();
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let task = runtime.spawn(async move {
            let mut interval_timer = time::interval_at(time::Instant::now() + period, period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval_timer.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                callback();
            }
        });

        TimerHandle::new(cancelled, Some(task.abort_handle()))
    }
}

struct ManualTimer {
    seq: u64,
    due: i64,
    period: Option<i64>,
    callback: TimerCallback,
    cancelled: Arc<AtomicBool>,
}

struct ManualClock {
    now: i64,
    timers: Vec<ManualTimer>,
}

/// Deterministic scheduler whose clock only moves when told to.
///
/// Timers fire synchronously from [`advance`](Self::advance), in due order.
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
    next_seq: AtomicU64,
}

impl ManualScheduler {
    pub fn new(start_millis: i64) -> Self {
        Self {
            clock: Mutex::new(ManualClock {
                now: start_millis,
                timers: Vec::new(),
            }),
            next_seq: AtomicU64::new(0),
        }
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, delay: Duration, period: Option<Duration>, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut clock = self.clock();
        let due = clock.now + delay.as_millis() as i64;
        clock.timers.push(ManualTimer {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            due,
            period: period.map(|p| (p.as_millis() as i64).max(1)),
            callback,
            cancelled: Arc::clone(&cancelled),
        });
        TimerHandle::new(cancelled, None)
    }

    /// Moves the clock forward, firing every timer that comes due on the way
    pub fn advance(&self, by: Duration) {
        let target = self.clock().now + by.as_millis() as i64;

        loop {
            let callback = {
                let mut clock = self.clock();
                clock.timers.retain(|t| !t.cancelled.load(Ordering::SeqCst));

                let next = clock
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(idx, _)| idx);

                let Some(idx) = next else {
                    clock.now = target;
                    break;
                };

                let due = clock.timers[idx].due;
                clock.now = due;
                let callback = Arc::clone(&clock.timers[idx].callback);
                match clock.timers[idx].period {
                    Some(period) => clock.timers[idx].due = due + period,
                    None => {
                        clock.timers.remove(idx);
                    }
                }
                callback
            };

            callback();
        }
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.clock()
            .timers
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Time until the earliest armed timer fires
    pub fn next_due_in(&self) -> Option<Duration> {
        let clock = self.clock();
        clock
            .timers
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .map(|t| t.due)
            .min()
            .map(|due| Duration::from_millis((due - clock.now).max(0) as u64))
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Scheduler for ManualScheduler {
    fn now_millis(&self) -> i64 {
        self.clock().now
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        self.insert(delay, None, callback)
    }

    fn schedule_interval(&self, period: Duration, callback: TimerCallback) -> TimerHandle {
        self.insert(period, Some(period), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, TimerCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        (
            hits,
            Arc::new(move || {
                hits_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_manual_once_fires_at_deadline() {
        let scheduler = ManualScheduler::new(1_000);
        let (hits, cb) = counter();
        let _handle = scheduler.schedule_once(Duration::from_millis(300), cb);

        scheduler.advance(Duration::from_millis(299));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.now_millis(), 1_300);

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_interval_repeats() {
        let scheduler = ManualScheduler::default();
        let (hits, cb) = counter();
        let _handle = scheduler.schedule_interval(Duration::from_millis(100), cb);

        scheduler.advance(Duration::from_millis(350));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.next_due_in(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let scheduler = ManualScheduler::default();
        let (hits, cb) = counter();
        let handle = scheduler.schedule_interval(Duration::from_millis(100), cb);
        scheduler.advance(Duration::from_millis(100));
        drop(handle);
        scheduler.advance(Duration::from_millis(1_000));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_once_and_cancel() {
        let scheduler = TokioScheduler::new();
        let (fired, cb) = counter();
        let _kept = scheduler.schedule_once(Duration::from_millis(50), cb);
        let (cancelled, cb) = counter();
        let dropped = scheduler.schedule_once(Duration::from_millis(50), cb);
        dropped.cancel();

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_interval() {
        let scheduler = TokioScheduler::new();
        let (hits, cb) = counter();
        let handle = scheduler.schedule_interval(Duration::from_millis(100), cb);

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        drop(handle);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_tokio_without_runtime_is_inert() {
        let (hits, cb) = counter();
        let handle = TokioScheduler::new().schedule_once(Duration::ZERO, cb);
        assert!(handle.is_cancelled());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
