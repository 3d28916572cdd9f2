//! Mutation-rate strategies and their tuning parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the mutation rate evolves over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MutationStrategy {
    /// Always `base_rate`.
    Constant,

    /// Linear interpolation from `max_rate` at generation 0 to `min_rate`
    /// at the final generation.
    LinearDecay,

    /// Geometric decay: `max_rate * decay_factor^generation`.
    ///
    /// Fast at first, then slow.
    ExponentialDecay,

    /// `base_rate` adjusted by stagnation, diversity and progress trend.
    #[default]
    Adaptive,

    /// Whatever was last passed to
    /// [`set_manual_rate`](super::MutationScheduler::set_manual_rate),
    /// falling back to `base_rate`.
    Manual,
}

impl fmt::Display for MutationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationStrategy::Constant => "constant",
            MutationStrategy::LinearDecay => "linear_decay",
            MutationStrategy::ExponentialDecay => "exponential_decay",
            MutationStrategy::Adaptive => "adaptive",
            MutationStrategy::Manual => "manual",
        };
        f.write_str(name)
    }
}

impl FromStr for MutationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "constant" => Ok(MutationStrategy::Constant),
            "linear_decay" | "linear" => Ok(MutationStrategy::LinearDecay),
            "exponential_decay" | "exponential" => Ok(MutationStrategy::ExponentialDecay),
            "adaptive" => Ok(MutationStrategy::Adaptive),
            "manual" => Ok(MutationStrategy::Manual),
            other => Err(format!("unknown mutation strategy: {other}")),
        }
    }
}

/// Configuration for the [`MutationScheduler`](super::MutationScheduler).
///
/// # Examples
///
/// ```
/// use u_gepa::mutation::{MutationConfig, MutationStrategy};
///
/// let config = MutationConfig::default()
///     .with_strategy(MutationStrategy::LinearDecay)
///     .with_bounds(0.1, 0.6)
///     .with_base_rate(0.3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub strategy: MutationStrategy,

    /// Starting rate for the adaptive strategy; the constant rate otherwise.
    pub base_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,

    /// Minimum best-fitness gain that counts as progress.
    pub improvement_threshold: f64,

    /// Number of trailing (generation, best fitness) pairs kept.
    pub history_window: usize,

    /// Per-generation factor for exponential decay, in (0, 1].
    pub decay_factor: f64,

    /// Rate added per stagnant generation.
    pub stagnation_step: f64,
    /// Upper bound on the accumulated stagnation bonus.
    pub max_stagnation_bonus: f64,

    /// Additive adjustment per diversity level, from critical to excellent.
    pub diversity_adjustments: [f64; 5],

    /// Mean per-generation gain above which progress counts as rapid.
    pub rapid_progress_threshold: f64,
    /// Mean per-generation gain below which progress counts as slow.
    pub slow_progress_threshold: f64,
    /// Magnitude of the progress-trend adjustment.
    pub progress_adjustment: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            strategy: MutationStrategy::default(),
            base_rate: 0.3,
            min_rate: 0.05,
            max_rate: 0.8,
            improvement_threshold: 0.01,
            history_window: 10,
            decay_factor: 0.9,
            stagnation_step: 0.05,
            max_stagnation_bonus: 0.3,
            diversity_adjustments: [0.15, 0.08, 0.0, -0.05, -0.1],
            rapid_progress_threshold: 0.05,
            slow_progress_threshold: 0.01,
            progress_adjustment: 0.05,
        }
    }
}

impl MutationConfig {
    pub fn with_strategy(mut self, strategy: MutationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_base_rate(mut self, rate: f64) -> Self {
        self.base_rate = rate;
        self
    }

    /// Sets `min_rate` and `max_rate`.
    pub fn with_bounds(mut self, min_rate: f64, max_rate: f64) -> Self {
        self.min_rate = min_rate;
        self.max_rate = max_rate;
        self
    }

    pub fn with_improvement_threshold(mut self, threshold: f64) -> Self {
        self.improvement_threshold = threshold.max(0.0);
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_decay_factor(mut self, factor: f64) -> Self {
        self.decay_factor = factor;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_rate) || !(0.0..=1.0).contains(&self.max_rate) {
            return Err("mutation rate bounds must lie in [0, 1]".into());
        }
        if self.min_rate > self.max_rate {
            return Err("min_rate must not exceed max_rate".into());
        }
        if !(self.min_rate..=self.max_rate).contains(&self.base_rate) {
            return Err("base_rate must lie within [min_rate, max_rate]".into());
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err("decay_factor must be in (0, 1]".into());
        }
        if self.history_window == 0 {
            return Err("history_window must be at least 1".into());
        }
        if self.improvement_threshold < 0.0 {
            return Err("improvement_threshold must be non-negative".into());
        }
        Ok(())
    }
}
