// Infrastructure module - Timers, heartbeat bookkeeping and task tracking
pub mod heartbeat;
pub mod scheduler;
pub mod task_manager;
pub mod timer;

pub use heartbeat::HeartbeatManager;
pub use scheduler::{ManualScheduler, Scheduler, TimerCallback, TimerHandle, TokioScheduler};
pub use task_manager::TaskManager;
pub use timer::Timer;
