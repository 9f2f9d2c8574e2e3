pub mod aggregator;
pub mod refresher;
pub mod scheduler;

pub use aggregator::{dedupe_by_name, Aggregator};
pub use refresher::Refresher;
pub use scheduler::{GameWindow, RefreshSchedule, Scheduler, SchedulerHandle};
