pub mod merger;
pub mod scheduler;
pub mod store;

pub use merger::merge;
pub use scheduler::{PollOutcome, PollScheduler, SchedulerState};
pub use store::{CommitOutcome, SnapshotStore, ViewState};
