//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the evaluation [`Scheduler`](super::Scheduler).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_gepa::scheduler::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_max_concurrent(8)
///     .with_default_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of evaluations allowed to run at once.
    pub max_concurrent: usize,

    /// Upper bound on pending plus running tasks.
    pub max_queue_size: usize,

    /// Dispatch by priority (ties FIFO). When false, pure FIFO.
    pub enable_priorities: bool,

    /// Deadline for tasks that do not carry their own.
    pub default_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_queue_size: 256,
            enable_priorities: true,
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_max_queue_size(mut self, n: usize) -> Self {
        self.max_queue_size = n;
        self
    }

    pub fn with_priorities(mut self, enabled: bool) -> Self {
        self.enable_priorities = enabled;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be at least 1".into());
        }
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be at least 1".into());
        }
        if self.default_timeout.is_zero() {
            return Err("default_timeout must be positive".into());
        }
        Ok(())
    }
}
