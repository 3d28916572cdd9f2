//! Budget limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits and allocation policy for a [`BudgetManager`](super::BudgetManager).
///
/// Every limit is optional; an unset limit never triggers exhaustion.
///
/// # Examples
///
/// ```
/// use u_gepa::budget::BudgetConfig;
///
/// let config = BudgetConfig::default()
///     .with_max_evaluations(500)
///     .with_budget_per_generation(50)
///     .with_carryover(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Maximum total evaluator calls.
    pub max_evaluations: Option<u64>,

    /// Maximum total monetary cost.
    pub max_cost: Option<f64>,

    /// Maximum number of recorded generations.
    pub max_generations: Option<u64>,

    /// Maximum total recorded evaluation time.
    pub max_time: Option<Duration>,

    /// Evaluations allocated to each generation.
    ///
    /// `None` disables per-generation allocation; the available budget is
    /// then simply what remains of `max_evaluations`.
    pub budget_per_generation: Option<u64>,

    /// Whether a generation's unused allocation rolls into the next one.
    pub allow_carryover: bool,

    /// Number of per-generation records kept in history.
    pub history_limit: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_evaluations: None,
            max_cost: None,
            max_generations: None,
            max_time: None,
            budget_per_generation: None,
            allow_carryover: false,
            history_limit: 100,
        }
    }
}

impl BudgetConfig {
    pub fn with_max_evaluations(mut self, n: u64) -> Self {
        self.max_evaluations = Some(n);
        self
    }

    pub fn with_max_cost(mut self, cost: f64) -> Self {
        self.max_cost = Some(cost);
        self
    }

    pub fn with_max_generations(mut self, n: u64) -> Self {
        self.max_generations = Some(n);
        self
    }

    pub fn with_max_time(mut self, time: Duration) -> Self {
        self.max_time = Some(time);
        self
    }

    pub fn with_budget_per_generation(mut self, n: u64) -> Self {
        self.budget_per_generation = Some(n);
        self
    }

    pub fn with_carryover(mut self, allow: bool) -> Self {
        self.allow_carryover = allow;
        self
    }

    pub fn with_history_limit(mut self, n: usize) -> Self {
        self.history_limit = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(cost) = self.max_cost {
            if !(cost >= 0.0) {
                return Err("max_cost must be non-negative".into());
            }
        }
        if self.budget_per_generation == Some(0) {
            return Err("budget_per_generation must be positive or None".into());
        }
        if self.history_limit == 0 {
            return Err("history_limit must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unlimited() {
        let config = BudgetConfig::default();
        assert!(config.max_evaluations.is_none());
        assert!(config.max_cost.is_none());
        assert!(config.max_generations.is_none());
        assert!(config.max_time.is_none());
        assert!(!config.allow_carryover);
        assert_eq!(config.history_limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BudgetConfig::default().with_max_cost(-1.0).validate().is_err());
        assert!(BudgetConfig::default()
            .with_budget_per_generation(0)
            .validate()
            .is_err());
        assert!(BudgetConfig::default().with_history_limit(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: BudgetConfig =
            serde_json::from_str(r#"{"max_evaluations": 40, "allow_carryover": true}"#).unwrap();
        assert_eq!(config.max_evaluations, Some(40));
        assert!(config.allow_carryover);
        assert_eq!(config.history_limit, 100);
    }
}
