//! Error types for every engine component.
//!
//! Component-local failures (capacity, lookup, state) are returned to the
//! immediate caller. Evaluation failures are absorbed by the scheduler and
//! surface as data in [`TaskOutcome`](crate::scheduler::TaskOutcome).

use std::path::PathBuf;

use thiserror::Error;

use crate::population::CandidateId;
use crate::scheduler::TaskId;

/// Errors raised by [`Population`](crate::population::Population).
#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("population capacity must be at least 1")]
    InvalidCapacity,

    #[error("population is full (capacity {capacity}) and the candidate does not beat the worst incumbent")]
    PopulationFull { capacity: usize },

    #[error("candidate {0} already exists")]
    DuplicateCandidate(CandidateId),

    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),

    #[error("snapshot file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("snapshot could not be decoded: {reason}")]
    DeserializationFailed { reason: String },

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("task spec has no candidate id")]
    MissingCandidateId,

    #[error("task spec has no evaluator")]
    MissingEvaluator,

    #[error("scheduler queue is full ({limit} tasks pending or running)")]
    QueueFull { limit: usize },

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {0} is still running")]
    TaskRunning(TaskId),

    #[error("task {0} is still pending")]
    TaskPending(TaskId),

    #[error("scheduler has been stopped")]
    Stopped,

    #[error("scheduler must be started from within a Tokio runtime")]
    NoRuntime,
}

/// Failure of a single evaluator call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("evaluation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("evaluation failed: {0}")]
    Failed(String),

    #[error("evaluator panicked: {0}")]
    Panicked(String),
}

impl EvaluationError {
    /// Returns `true` for [`EvaluationError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, EvaluationError::Timeout(_))
    }
}

/// Failure reported by a reflection or crossover collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("reflection failed: {0}")]
    Reflection(String),

    #[error("crossover failed: {0}")]
    Crossover(String),
}

/// Errors raised by [`Optimizer`](crate::optimizer::Optimizer).
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("optimizer configuration requires a task descriptor")]
    TaskConfigRequired,

    #[error("invalid optimizer configuration: {0}")]
    InvalidConfig(String),

    #[error("optimize() is already running on this optimizer")]
    AlreadyRunning,

    #[error("optimizer is not ready (state: {0})")]
    NotReady(String),

    #[error(transparent)]
    Population(#[from] PopulationError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = PopulationError::CandidateNotFound(CandidateId::from("abc"));
        assert_eq!(err.to_string(), "candidate abc not found");

        let err = SchedulerError::QueueFull { limit: 4 };
        assert!(err.to_string().contains('4'));

        let err = PopulationError::UnsupportedVersion {
            found: 9,
            expected: 1,
        };
        assert!(err.to_string().contains("version 9"));
    }

    #[test]
    fn test_timeout_predicate() {
        assert!(EvaluationError::Timeout(std::time::Duration::from_millis(5)).is_timeout());
        assert!(!EvaluationError::Failed("boom".into()).is_timeout());
    }

    #[test]
    fn test_optimizer_error_wraps_components() {
        let err: OptimizerError = SchedulerError::Stopped.into();
        assert!(matches!(err, OptimizerError::Scheduler(SchedulerError::Stopped)));
    }
}
