//! Concurrent evaluation scheduling.
//!
//! [`Scheduler`] owns a bounded pool of Tokio worker tasks fed from a
//! priority queue. Each submitted [`TaskSpec`] names a candidate, the prompt
//! to evaluate and the [`Evaluator`](crate::collaborators::Evaluator) to run
//! it with.
//!
//! ```text
//! submit_task ─▶ pending (heap: priority, then FIFO)
//!                  │ free slot
//!                  ▼
//!               running ─▶ completed | failed ─▶ results store ─▶ prune
//!                  │
//!                  └─ abort ─▶ cancelled
//!
//! cancel_task: pending ─▶ cancelled
//! ```
//!
//! Evaluator errors, timeouts and panics all become
//! [`TaskOutcome::Failed`] records. Results stay readable until
//! [`Scheduler::prune`] is called.

mod config;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use runner::Scheduler;
pub use types::{
    Priority, SchedulerStatus, TaskId, TaskOutcome, TaskResult, TaskSpec, TaskState,
};
