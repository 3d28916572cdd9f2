//! Task specifications, states and outcomes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborators::{Evaluation, Evaluator, TaskDescriptor};
use crate::error::EvaluationError;
use crate::population::CandidateId;

/// Identifier assigned to a task at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dispatch priority. Higher variants run first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" | "default" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A unit of work submitted to the scheduler.
///
/// `candidate_id` and `evaluator` are optional so that incomplete specs
/// can be rejected at submission with a typed error.
#[derive(Clone, Default)]
pub struct TaskSpec {
    pub candidate_id: Option<CandidateId>,
    pub prompt: String,
    pub task: TaskDescriptor,
    pub evaluator: Option<Arc<dyn Evaluator>>,
    pub priority: Priority,
    /// Overrides the scheduler's default timeout.
    pub timeout: Option<Duration>,
    pub metadata: BTreeMap<String, String>,
}

impl TaskSpec {
    pub fn new(
        candidate_id: CandidateId,
        prompt: impl Into<String>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            candidate_id: Some(candidate_id),
            prompt: prompt.into(),
            evaluator: Some(evaluator),
            ..Self::default()
        }
    }

    pub fn with_task(mut self, task: TaskDescriptor) -> Self {
        self.task = task;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("candidate_id", &self.candidate_id)
            .field("prompt", &self.prompt)
            .field("task", &self.task)
            .field("has_evaluator", &self.evaluator.is_some())
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Lifecycle position of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running)
    }
}

/// Result of running the evaluator for one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed(Evaluation),
    Failed(EvaluationError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            TaskOutcome::Completed(evaluation) => Some(evaluation),
            TaskOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&EvaluationError> {
        match self {
            TaskOutcome::Completed(_) => None,
            TaskOutcome::Failed(err) => Some(err),
        }
    }
}

/// Stored record of a finished task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub candidate_id: CandidateId,
    pub outcome: TaskOutcome,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Time spent inside the evaluator.
    pub duration: Duration,
    pub metadata: BTreeMap<String, String>,
}

impl TaskResult {
    pub fn state(&self) -> TaskState {
        if self.outcome.is_success() {
            TaskState::Completed
        } else {
            TaskState::Failed
        }
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub running: usize,
    pub pending: usize,
    /// Results currently held in the completed store, until pruned.
    pub finished: usize,
    pub max_concurrent: usize,
    /// `running / max_concurrent`.
    pub utilization: f64,
    /// Finished tasks per second of uptime.
    pub throughput: f64,
    pub uptime: Duration,
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
    /// Running tasks killed by [`Scheduler::abort`](super::Scheduler::abort).
    pub total_aborted: u64,
    pub stopped: bool,
}

/// Heap entry: priority first, then submission order.
#[derive(Debug)]
pub(super) struct QueuedTask {
    pub(super) id: TaskId,
    pub(super) priority: Priority,
    pub(super) seq: u64,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            // earlier submission wins within a priority (max-heap)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!("HIGH".parse(), Ok(Priority::High));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_heap_priority_then_fifo() {
        let mut heap = BinaryHeap::new();
        let entries = [
            (Priority::Normal, 0),
            (Priority::Low, 1),
            (Priority::Critical, 2),
            (Priority::Normal, 3),
            (Priority::Critical, 4),
        ];
        for (priority, seq) in entries {
            heap.push(QueuedTask {
                id: TaskId::generate(),
                priority,
                seq,
            });
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|t| t.seq)).collect();
        assert_eq!(order, vec![2, 4, 0, 3, 1]);
    }

    #[test]
    fn test_task_spec_builder() {
        let spec = TaskSpec::default()
            .with_priority(Priority::High)
            .with_timeout(Duration::from_millis(50))
            .with_metadata("origin", "seed");
        assert!(spec.candidate_id.is_none());
        assert!(spec.evaluator.is_none());
        assert_eq!(spec.priority, Priority::High);
        assert_eq!(spec.metadata.get("origin").map(String::as_str), Some("seed"));
        assert!(format!("{spec:?}").contains("has_evaluator: false"));
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = TaskOutcome::Completed(Evaluation::with_fitness(0.7));
        assert!(ok.is_success());
        assert!(ok.evaluation().is_some());
        let failed = TaskOutcome::Failed(EvaluationError::Failed("x".into()));
        assert!(failed.error().is_some());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }
}
