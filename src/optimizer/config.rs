//! Optimizer configuration.
//!
//! [`OptimizerConfig`] holds every parameter of a run: population shape,
//! termination, evaluation concurrency, selection and reproduction rates,
//! plus the nested [`MutationConfig`] and [`BudgetConfig`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::selection::Selection;
use crate::budget::BudgetConfig;
use crate::collaborators::TaskDescriptor;
use crate::mutation::MutationConfig;
use crate::pareto::Objective;
use crate::scheduler::SchedulerConfig;

/// Configuration for the [`Optimizer`](super::Optimizer).
///
/// # Defaults
///
/// ```
/// use u_gepa::optimizer::OptimizerConfig;
///
/// let config = OptimizerConfig::default();
/// assert_eq!(config.population_size, 10);
/// assert_eq!(config.max_generations, 10);
/// assert!(config.task.is_none());
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_gepa::optimizer::{OptimizerConfig, Selection};
///
/// let config = OptimizerConfig::default()
///     .with_task(serde_json::json!({"dataset": "gsm8k"}))
///     .with_seed_prompts(["Solve the problem."])
///     .with_population_size(16)
///     .with_selection(Selection::Tournament(4))
///     .with_evaluation_budget(200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Number of candidates per generation.
    pub population_size: usize,

    /// Generations to run before stopping with `MaxGenerationsReached`.
    pub max_generations: u64,

    /// Shorthand for `budget.max_evaluations`; the stricter of the two wins.
    pub evaluation_budget: Option<u64>,

    /// Initial prompts. Topped up with generated variants when fewer than
    /// `population_size`.
    pub seed_prompts: Vec<String>,

    /// Opaque descriptor handed to the evaluator. Required.
    pub task: Option<TaskDescriptor>,

    /// Concurrent evaluator calls.
    pub parallelism: usize,

    /// Scheduler queue limit; must hold a full generation.
    pub max_queue_size: usize,

    pub enable_priorities: bool,

    /// Deadline for each evaluator call.
    pub evaluation_timeout: Duration,

    /// Top candidates carried unchanged into the next generation.
    pub elite_count: usize,

    /// Probability of recombining two parents (0.0–1.0).
    pub crossover_rate: f64,

    pub selection: Selection,

    /// Objectives for Pareto ranking. Empty means single-objective on
    /// fitness.
    pub objectives: Vec<Objective>,

    /// Best-fitness variance below which the run counts as converged.
    pub convergence_epsilon: f64,

    /// Number of trailing generations the variance is taken over.
    pub convergence_window: usize,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,

    pub mutation: MutationConfig,

    pub budget: BudgetConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            max_generations: 10,
            evaluation_budget: None,
            seed_prompts: Vec::new(),
            task: None,
            parallelism: 4,
            max_queue_size: 256,
            enable_priorities: true,
            evaluation_timeout: Duration::from_secs(30),
            elite_count: 2,
            crossover_rate: 0.5,
            selection: Selection::default(),
            objectives: Vec::new(),
            convergence_epsilon: 0.001,
            convergence_window: 3,
            seed: None,
            mutation: MutationConfig::default(),
            budget: BudgetConfig::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn with_task(mut self, task: TaskDescriptor) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_seed_prompts<I, S>(mut self, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_prompts = prompts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_max_generations(mut self, n: u64) -> Self {
        self.max_generations = n;
        self
    }

    pub fn with_evaluation_budget(mut self, n: u64) -> Self {
        self.evaluation_budget = Some(n);
        self
    }

    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = n;
        self
    }

    pub fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    pub fn with_elite_count(mut self, n: usize) -> Self {
        self.elite_count = n;
        self
    }

    /// Sets the crossover rate, clamped to [0, 1].
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Convenience builder for `Selection::Tournament(k)`.
    pub fn with_tournament_size(self, k: usize) -> Self {
        self.with_selection(Selection::Tournament(k))
    }

    pub fn with_objectives(mut self, objectives: Vec<Objective>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn with_convergence(mut self, epsilon: f64, window: usize) -> Self {
        self.convergence_epsilon = epsilon.max(0.0);
        self.convergence_window = window;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_mutation(mut self, mutation: MutationConfig) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    /// Shorthand for `budget.allow_carryover`.
    pub fn with_carryover(mut self, allow: bool) -> Self {
        self.budget.allow_carryover = allow;
        self
    }

    /// Preset for quick iterations: 6 candidates, 5 generations.
    pub fn fast() -> Self {
        Self {
            population_size: 6,
            max_generations: 5,
            elite_count: 1,
            evaluation_timeout: Duration::from_secs(15),
            ..Self::default()
        }
    }

    /// Preset with the default shape: 10 candidates, 10 generations.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Preset for quality: 24 candidates, 30 generations, tighter
    /// convergence.
    pub fn thorough() -> Self {
        Self {
            population_size: 24,
            max_generations: 30,
            elite_count: 4,
            parallelism: 8,
            convergence_epsilon: 0.0005,
            convergence_window: 5,
            evaluation_timeout: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Budget limits with `evaluation_budget` folded in.
    pub fn effective_budget(&self) -> BudgetConfig {
        let mut budget = self.budget.clone();
        if let Some(n) = self.evaluation_budget {
            budget.max_evaluations = Some(budget.max_evaluations.map_or(n, |m| m.min(n)));
        }
        budget
    }

    /// Scheduler settings derived from this configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_max_concurrent(self.parallelism)
            .with_max_queue_size(self.max_queue_size)
            .with_priorities(self.enable_priorities)
            .with_default_timeout(self.evaluation_timeout)
    }

    /// Validates the configuration.
    ///
    /// A missing task is reported separately by
    /// [`Optimizer::start`](super::Optimizer::start).
    pub fn validate(&self) -> Result<(), String> {
        if self.population_size < 2 {
            return Err("population_size must be at least 2".into());
        }
        if self.max_generations == 0 {
            return Err("max_generations must be at least 1".into());
        }
        if self.elite_count >= self.population_size {
            return Err("elite_count must be smaller than population_size".into());
        }
        if self.max_queue_size < self.population_size {
            return Err("max_queue_size must hold a full generation".into());
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err("crossover_rate must be in [0, 1]".into());
        }
        if self.convergence_window < 2 {
            return Err("convergence_window must be at least 2".into());
        }
        if self.convergence_epsilon < 0.0 {
            return Err("convergence_epsilon must be non-negative".into());
        }
        if self.evaluation_budget == Some(0) {
            return Err("evaluation_budget must be positive or None".into());
        }
        if let Selection::Tournament(0) = self.selection {
            return Err("tournament size must be at least 1".into());
        }
        self.scheduler_config().validate()?;
        self.mutation.validate()?;
        self.budget.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> OptimizerConfig {
        OptimizerConfig::default().with_task(serde_json::json!({"name": "t"}))
    }

    #[test]
    fn test_default_config() {
        let config = OptimizerConfig::default();
        assert_eq!(config.population_size, 10);
        assert_eq!(config.max_generations, 10);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.elite_count, 2);
        assert_eq!(config.selection, Selection::Tournament(3));
        assert!((config.crossover_rate - 0.5).abs() < 1e-12);
        assert!((config.convergence_epsilon - 0.001).abs() < 1e-12);
        assert_eq!(config.convergence_window, 3);
        assert!(config.objectives.is_empty());
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = valid()
            .with_population_size(20)
            .with_max_generations(7)
            .with_parallelism(2)
            .with_elite_count(3)
            .with_crossover_rate(1.7)
            .with_tournament_size(5)
            .with_seed(42)
            .with_carryover(true);
        assert_eq!(config.population_size, 20);
        assert_eq!(config.max_generations, 7);
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.elite_count, 3);
        assert!((config.crossover_rate - 1.0).abs() < 1e-12);
        assert_eq!(config.selection, Selection::Tournament(5));
        assert_eq!(config.seed, Some(42));
        assert!(config.budget.allow_carryover);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(valid().with_population_size(1).validate().is_err());
        assert!(valid().with_max_generations(0).validate().is_err());
        assert!(valid().with_elite_count(10).validate().is_err());
        assert!(valid().with_parallelism(0).validate().is_err());
        assert!(valid().with_convergence(0.001, 1).validate().is_err());
        assert!(valid().with_tournament_size(0).validate().is_err());

        let mut small_queue = valid();
        small_queue.max_queue_size = 4;
        assert!(small_queue.validate().is_err());

        let bad_mutation = valid().with_mutation(MutationConfig::default().with_bounds(0.9, 0.1));
        assert!(bad_mutation.validate().is_err());
    }

    #[test]
    fn test_effective_budget_takes_stricter_limit() {
        let config = valid().with_evaluation_budget(50);
        assert_eq!(config.effective_budget().max_evaluations, Some(50));

        let config = valid()
            .with_budget(BudgetConfig::default().with_max_evaluations(30))
            .with_evaluation_budget(50);
        assert_eq!(config.effective_budget().max_evaluations, Some(30));
    }

    #[test]
    fn test_presets_validate() {
        for config in [
            OptimizerConfig::fast(),
            OptimizerConfig::balanced(),
            OptimizerConfig::thorough(),
        ] {
            assert!(config.validate().is_ok());
        }
        assert!(OptimizerConfig::fast().population_size < OptimizerConfig::thorough().population_size);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: OptimizerConfig = serde_json::from_str(
            r#"{"population_size": 12, "seed_prompts": ["a", "b"], "task": {"k": 1},
                "mutation": {"strategy": "linear_decay"}}"#,
        )
        .unwrap();
        assert_eq!(config.population_size, 12);
        assert_eq!(config.seed_prompts.len(), 2);
        assert!(config.task.is_some());
        assert_eq!(config.max_generations, 10);
        assert_eq!(
            config.mutation.strategy,
            crate::mutation::MutationStrategy::LinearDecay
        );
    }
}
