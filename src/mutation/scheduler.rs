//! Adaptive exploration/exploitation rate control.

use std::collections::VecDeque;

use tracing::trace;

use super::config::{MutationConfig, MutationStrategy};
use crate::collaborators::{DiversityLevel, DiversitySnapshot};

/// Produces the mutation rate for each generation.
///
/// Keeps a bounded trailing history of `(generation, best fitness)` pairs
/// and a stagnation counter. Every returned rate lies in
/// `[min_rate, max_rate]`.
///
/// # Examples
///
/// ```
/// use u_gepa::mutation::{MutationConfig, MutationScheduler, MutationStrategy};
///
/// let mut scheduler = MutationScheduler::new(
///     MutationConfig::default().with_strategy(MutationStrategy::LinearDecay),
/// )
/// .unwrap();
/// let first = scheduler.next_rate(0, 10, Some(0.2), None);
/// let last = scheduler.next_rate(10, 10, Some(0.5), None);
/// assert!(first > last);
/// ```
#[derive(Debug, Clone)]
pub struct MutationScheduler {
    config: MutationConfig,
    current_rate: f64,
    manual_rate: Option<f64>,
    history: VecDeque<(u64, f64)>,
    stagnation_generations: u32,
}

impl MutationScheduler {
    /// Creates a scheduler after validating `config`.
    pub fn new(config: MutationConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            history: VecDeque::with_capacity(config.history_window),
            current_rate: config.base_rate,
            config,
            manual_rate: None,
            stagnation_generations: 0,
        })
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn manual_rate(&self) -> Option<f64> {
        self.manual_rate
    }

    pub fn stagnation_generations(&self) -> u32 {
        self.stagnation_generations
    }

    /// Trailing `(generation, best fitness)` pairs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &(u64, f64)> {
        self.history.iter()
    }

    /// Sets (clamped to the configured bounds) or clears the manual
    /// override. While set it takes precedence over every strategy.
    pub fn set_manual_rate(&mut self, rate: Option<f64>) {
        self.manual_rate = rate
            .filter(|r| r.is_finite())
            .map(|r| self.clamp(r));
        if let Some(rate) = self.manual_rate {
            self.current_rate = rate;
        }
    }

    /// Computes the rate for `current_generation` and records the
    /// generation's best fitness in the trailing history.
    pub fn next_rate(
        &mut self,
        current_generation: u64,
        max_generations: u64,
        best_fitness: Option<f64>,
        diversity: Option<&DiversitySnapshot>,
    ) -> f64 {
        if let Some(best) = best_fitness.filter(|f| f.is_finite()) {
            self.observe(current_generation, best);
        }

        let rate = match (self.manual_rate, self.config.strategy) {
            (Some(manual), _) => manual,
            (None, MutationStrategy::Constant | MutationStrategy::Manual) => self.config.base_rate,
            (None, MutationStrategy::LinearDecay) => {
                self.linear_decay(current_generation, max_generations)
            }
            (None, MutationStrategy::ExponentialDecay) => {
                self.config.max_rate * self.config.decay_factor.powf(current_generation as f64)
            }
            (None, MutationStrategy::Adaptive) => self.adaptive(diversity),
        };

        self.current_rate = self.clamp(rate);
        trace!(
            generation = current_generation,
            strategy = %self.config.strategy,
            rate = self.current_rate,
            stagnation = self.stagnation_generations,
            "mutation rate computed"
        );
        self.current_rate
    }

    /// Clears history, stagnation and the manual override.
    pub fn reset(&mut self) {
        self.history.clear();
        self.stagnation_generations = 0;
        self.manual_rate = None;
        self.current_rate = self.clamp(self.config.base_rate);
    }

    fn clamp(&self, rate: f64) -> f64 {
        let rate = if rate.is_finite() {
            rate
        } else {
            self.config.base_rate
        };
        rate.clamp(self.config.min_rate, self.config.max_rate)
    }

    fn observe(&mut self, generation: u64, best: f64) {
        if let Some(previous_best) = self
            .history
            .iter()
            .map(|&(_, f)| f)
            .reduce(f64::max)
        {
            if best - previous_best > self.config.improvement_threshold {
                self.stagnation_generations = 0;
            } else {
                self.stagnation_generations = self.stagnation_generations.saturating_add(1);
            }
        }

        self.history.push_back((generation, best));
        while self.history.len() > self.config.history_window {
            self.history.pop_front();
        }
    }

    fn linear_decay(&self, generation: u64, max_generations: u64) -> f64 {
        if max_generations == 0 {
            return self.config.max_rate;
        }
        let t = (generation as f64 / max_generations as f64).min(1.0);
        self.config.max_rate - (self.config.max_rate - self.config.min_rate) * t
    }

    fn adaptive(&self, diversity: Option<&DiversitySnapshot>) -> f64 {
        let c = &self.config;

        let stagnation_bonus =
            (self.stagnation_generations as f64 * c.stagnation_step).min(c.max_stagnation_bonus);

        let diversity_adjustment = diversity
            .map(|d| {
                let idx = match d.level {
                    DiversityLevel::Critical => 0,
                    DiversityLevel::Low => 1,
                    DiversityLevel::Moderate => 2,
                    DiversityLevel::Healthy => 3,
                    DiversityLevel::Excellent => 4,
                };
                c.diversity_adjustments[idx]
            })
            .unwrap_or(0.0);

        let trend_adjustment = match self.progress_trend() {
            Some(trend) if trend > c.rapid_progress_threshold => -c.progress_adjustment,
            Some(trend) if trend < c.slow_progress_threshold => c.progress_adjustment,
            _ => 0.0,
        };

        c.base_rate + stagnation_bonus + diversity_adjustment + trend_adjustment
    }

    /// Mean best-fitness gain per generation across the trailing history.
    fn progress_trend(&self) -> Option<f64> {
        if self.history.len() < 2 {
            return None;
        }
        let (first_gen, first_fit) = *self.history.front()?;
        let (last_gen, last_fit) = *self.history.back()?;
        let span = last_gen.saturating_sub(first_gen).max(1) as f64;
        Some((last_fit - first_fit) / span)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(level: DiversityLevel) -> DiversitySnapshot {
        DiversitySnapshot {
            level,
            pairwise_diversity: 0.5,
        }
    }

    fn scheduler(strategy: MutationStrategy) -> MutationScheduler {
        MutationScheduler::new(MutationConfig::default().with_strategy(strategy)).unwrap()
    }

    #[test]
    fn test_constant_returns_base() {
        let mut s = scheduler(MutationStrategy::Constant);
        for g in 0..5 {
            let rate = s.next_rate(g, 5, Some(0.1 * g as f64), None);
            assert!((rate - 0.3).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_decay_endpoints() {
        let mut s = scheduler(MutationStrategy::LinearDecay);
        assert!((s.next_rate(0, 10, None, None) - 0.8).abs() < 1e-12);
        assert!((s.next_rate(5, 10, None, None) - 0.425).abs() < 1e-12);
        assert!((s.next_rate(10, 10, None, None) - 0.05).abs() < 1e-12);
        assert!((s.next_rate(20, 10, None, None) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_linear_decay_zero_generations() {
        let mut s = scheduler(MutationStrategy::LinearDecay);
        assert!((s.next_rate(3, 0, None, None) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_decay_fast_then_slow() {
        let mut s = scheduler(MutationStrategy::ExponentialDecay);
        let r0 = s.next_rate(0, 50, None, None);
        let r1 = s.next_rate(1, 50, None, None);
        let r2 = s.next_rate(2, 50, None, None);
        assert!((r0 - 0.8).abs() < 1e-12);
        assert!(r0 - r1 > r1 - r2);
        assert!((s.next_rate(500, 50, None, None) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_manual_override_beats_adaptive() {
        let mut s = scheduler(MutationStrategy::Adaptive);
        s.set_manual_rate(Some(0.5));
        assert!((s.current_rate() - 0.5).abs() < 1e-12);
        assert!((s.next_rate(1, 10, Some(0.2), Some(&snapshot(DiversityLevel::Critical))) - 0.5).abs() < 1e-12);

        s.set_manual_rate(Some(5.0));
        assert!((s.manual_rate().unwrap() - 0.8).abs() < 1e-12);

        s.set_manual_rate(None);
        assert!(s.manual_rate().is_none());
    }

    #[test]
    fn test_manual_strategy_without_rate_uses_base() {
        let mut s = scheduler(MutationStrategy::Manual);
        assert!((s.next_rate(0, 10, None, None) - 0.3).abs() < 1e-12);
        s.set_manual_rate(Some(0.01));
        assert!((s.next_rate(1, 10, None, None) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_adaptive_stagnation_grows_then_resets() {
        let mut s = scheduler(MutationStrategy::Adaptive);
        s.next_rate(0, 20, Some(0.5), None);
        s.next_rate(1, 20, Some(0.5), None);
        s.next_rate(2, 20, Some(0.5), None);
        assert_eq!(s.stagnation_generations(), 2);
        let stagnant = s.current_rate();

        s.next_rate(3, 20, Some(0.9), None);
        assert_eq!(s.stagnation_generations(), 0);
        assert!(s.current_rate() < stagnant);
    }

    #[test]
    fn test_adaptive_diversity_is_monotonic() {
        let levels = [
            DiversityLevel::Critical,
            DiversityLevel::Low,
            DiversityLevel::Moderate,
            DiversityLevel::Healthy,
            DiversityLevel::Excellent,
        ];
        let rates: Vec<f64> = levels
            .iter()
            .map(|&level| {
                let mut s = scheduler(MutationStrategy::Adaptive);
                s.next_rate(0, 10, Some(0.5), Some(&snapshot(level)))
            })
            .collect();
        assert!(rates.windows(2).all(|w| w[0] > w[1]), "rates: {rates:?}");
    }

    #[test]
    fn test_adaptive_progress_trend() {
        let mut rapid = scheduler(MutationStrategy::Adaptive);
        rapid.next_rate(0, 10, Some(0.1), None);
        let rapid_rate = rapid.next_rate(1, 10, Some(0.4), None);
        assert!((rapid_rate - 0.25).abs() < 1e-12);

        let mut slow = scheduler(MutationStrategy::Adaptive);
        slow.next_rate(0, 10, Some(0.1), None);
        let slow_rate = slow.next_rate(1, 10, Some(0.105), None);
        // stagnation bonus (one generation) plus slow-progress adjustment
        assert!((slow_rate - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_history_window_bounded() {
        let mut s = MutationScheduler::new(MutationConfig::default().with_history_window(3))
            .unwrap();
        for g in 0..10 {
            s.next_rate(g, 10, Some(g as f64 / 10.0), None);
        }
        let gens: Vec<u64> = s.history().map(|&(g, _)| g).collect();
        assert_eq!(gens, vec![7, 8, 9]);
    }

    #[test]
    fn test_reset() {
        let mut s = scheduler(MutationStrategy::Adaptive);
        s.next_rate(0, 10, Some(0.5), None);
        s.next_rate(1, 10, Some(0.5), None);
        s.set_manual_rate(Some(0.7));
        s.reset();
        assert_eq!(s.history().count(), 0);
        assert_eq!(s.stagnation_generations(), 0);
        assert!(s.manual_rate().is_none());
        assert!((s.current_rate() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let inverted = MutationConfig::default().with_bounds(0.6, 0.2);
        assert!(MutationScheduler::new(inverted).is_err());
        let zero_window = MutationConfig::default().with_history_window(0);
        assert!(MutationScheduler::new(zero_window).is_err());
    }

    fn any_strategy() -> impl Strategy<Value = MutationStrategy> {
        prop_oneof![
            Just(MutationStrategy::Constant),
            Just(MutationStrategy::LinearDecay),
            Just(MutationStrategy::ExponentialDecay),
            Just(MutationStrategy::Adaptive),
            Just(MutationStrategy::Manual),
        ]
    }

    fn any_level() -> impl Strategy<Value = DiversityLevel> {
        prop_oneof![
            Just(DiversityLevel::Critical),
            Just(DiversityLevel::Low),
            Just(DiversityLevel::Moderate),
            Just(DiversityLevel::Healthy),
            Just(DiversityLevel::Excellent),
        ]
    }

    proptest! {
        #[test]
        fn prop_rate_within_bounds(
            strategy in any_strategy(),
            min in 0.0f64..0.5,
            width in 0.0f64..0.5,
            steps in prop::collection::vec(
                (0u64..200, 0u64..100, prop::option::of(-1.0f64..2.0), prop::option::of(any_level())),
                1..25,
            ),
            manual in prop::option::of(-1.0f64..2.0),
        ) {
            let max = min + width;
            let config = MutationConfig::default()
                .with_strategy(strategy)
                .with_bounds(min, max)
                .with_base_rate(min + width / 2.0);
            let mut s = MutationScheduler::new(config).unwrap();
            s.set_manual_rate(manual);
            for (generation, max_generations, best, level) in steps {
                let diversity = level.map(snapshot);
                let rate = s.next_rate(generation, max_generations, best, diversity.as_ref());
                prop_assert!(rate >= min && rate <= max, "rate {} outside [{}, {}]", rate, min, max);
            }
        }
    }
}
