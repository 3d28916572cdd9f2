//! Resource consumption ledger.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::BudgetConfig;

/// A remaining-budget quantity, or `Unlimited` when no limit is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Remaining<T> {
    Unlimited,
    Limited(T),
}

impl<T: Copy> Remaining<T> {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Remaining::Unlimited)
    }

    /// The limited amount, or `None` when unlimited.
    pub fn limited(&self) -> Option<T> {
        match self {
            Remaining::Unlimited => None,
            Remaining::Limited(v) => Some(*v),
        }
    }
}

/// Resources consumed by one generation.
///
/// Passed to [`BudgetManager::record_consumption`]; unset fields count as
/// zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Consumption {
    pub evaluations: u64,
    pub cost: f64,
    pub time: Duration,
    /// Generation to record against; `None` advances the counter.
    pub generation: Option<u64>,
}

impl Consumption {
    pub fn evaluations(n: u64) -> Self {
        Self {
            evaluations: n,
            ..Self::default()
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_time(mut self, time: Duration) -> Self {
        self.time = time;
        self
    }

    pub fn for_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }
}

/// History entry for one recorded generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: u64,
    pub evaluations: u64,
    pub cost: f64,
    pub time: Duration,
    pub recorded_at: DateTime<Utc>,
}

/// Tracks cumulative consumption of evaluations, cost and time against
/// optional limits.
///
/// Exhaustion is monotonic: once any configured limit is reached it stays
/// reached until [`reset`](Self::reset).
///
/// # Examples
///
/// ```
/// use u_gepa::budget::{BudgetConfig, BudgetManager, Consumption, Remaining};
///
/// let mut budget = BudgetManager::new(BudgetConfig::default().with_max_evaluations(100)).unwrap();
/// budget.record_consumption(Consumption::evaluations(100));
/// assert!(budget.budget_exhausted());
/// assert_eq!(budget.remaining_evaluations(), Remaining::Limited(0));
/// ```
#[derive(Debug, Clone)]
pub struct BudgetManager {
    config: BudgetConfig,
    evaluations_used: u64,
    cost_used: f64,
    time_used: Duration,
    current_generation: u64,
    carryover: u64,
    /// Most recent first.
    history: VecDeque<GenerationRecord>,
    started_at: Instant,
    exhaustion_reported: bool,
}

impl BudgetManager {
    /// Creates a ledger after validating `config`.
    pub fn new(config: BudgetConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            history: VecDeque::with_capacity(config.history_limit.min(128)),
            config,
            evaluations_used: 0,
            cost_used: 0.0,
            time_used: Duration::ZERO,
            current_generation: 0,
            carryover: 0,
            started_at: Instant::now(),
            exhaustion_reported: false,
        })
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Adds one generation's consumption to the cumulative counters.
    pub fn record_consumption(&mut self, consumption: Consumption) {
        let generation = match consumption.generation {
            Some(g) => {
                self.current_generation = self.current_generation.max(g);
                g
            }
            None => {
                self.current_generation += 1;
                self.current_generation
            }
        };

        self.evaluations_used += consumption.evaluations;
        self.cost_used += consumption.cost.max(0.0);
        self.time_used += consumption.time;

        self.carryover = match self.config.budget_per_generation {
            Some(base) if self.config.allow_carryover => {
                base.saturating_sub(consumption.evaluations)
            }
            _ => 0,
        };

        self.history.push_front(GenerationRecord {
            generation,
            evaluations: consumption.evaluations,
            cost: consumption.cost,
            time: consumption.time,
            recorded_at: Utc::now(),
        });
        self.history.truncate(self.config.history_limit);

        debug!(
            generation,
            evaluations = consumption.evaluations,
            total_evaluations = self.evaluations_used,
            total_cost = self.cost_used,
            carryover = self.carryover,
            "budget consumption recorded"
        );

        self.report_exhaustion();
    }

    /// Adds consumption that belongs to the generation already recorded,
    /// such as reproduction time or evaluations whose results were never
    /// collected.
    ///
    /// Unlike [`record_consumption`](Self::record_consumption) this neither
    /// advances the generation nor touches carryover, and
    /// `consumption.generation` is ignored. The amounts are folded into the
    /// most recent history record.
    pub fn charge(&mut self, consumption: Consumption) {
        self.evaluations_used += consumption.evaluations;
        self.cost_used += consumption.cost.max(0.0);
        self.time_used += consumption.time;
        if let Some(latest) = self.history.front_mut() {
            latest.evaluations += consumption.evaluations;
            latest.cost += consumption.cost;
            latest.time += consumption.time;
        }
        self.report_exhaustion();
    }

    fn report_exhaustion(&mut self) {
        if !self.exhaustion_reported && self.budget_exhausted() {
            self.exhaustion_reported = true;
            info!(
                evaluations = self.evaluations_used,
                cost = self.cost_used,
                generations = self.current_generation,
                time_ms = self.time_used.as_millis() as u64,
                "budget exhausted"
            );
        }
    }

    /// `true` once any configured limit has been reached.
    pub fn budget_exhausted(&self) -> bool {
        let c = &self.config;
        c.max_evaluations.is_some_and(|max| self.evaluations_used >= max)
            || c.max_cost.is_some_and(|max| self.cost_used >= max)
            || c.max_generations.is_some_and(|max| self.current_generation >= max)
            || c.max_time.is_some_and(|max| self.time_used >= max)
    }

    pub fn remaining_evaluations(&self) -> Remaining<u64> {
        match self.config.max_evaluations {
            Some(max) => Remaining::Limited(max.saturating_sub(self.evaluations_used)),
            None => Remaining::Unlimited,
        }
    }

    pub fn remaining_cost(&self) -> Remaining<f64> {
        match self.config.max_cost {
            Some(max) => Remaining::Limited((max - self.cost_used).max(0.0)),
            None => Remaining::Unlimited,
        }
    }

    pub fn remaining_generations(&self) -> Remaining<u64> {
        match self.config.max_generations {
            Some(max) => Remaining::Limited(max.saturating_sub(self.current_generation)),
            None => Remaining::Unlimited,
        }
    }

    pub fn remaining_time(&self) -> Remaining<Duration> {
        match self.config.max_time {
            Some(max) => Remaining::Limited(max.saturating_sub(self.time_used)),
            None => Remaining::Unlimited,
        }
    }

    /// Evaluations available to the current generation.
    ///
    /// With a per-generation allocation this is the base allocation plus,
    /// when carryover is enabled, the unused part of the previous
    /// generation's base allocation. Without one it is whatever remains of
    /// the evaluation limit.
    pub fn available_budget(&self) -> Remaining<u64> {
        match self.config.budget_per_generation {
            Some(base) => Remaining::Limited(base.saturating_add(self.carryover)),
            None => self.remaining_evaluations(),
        }
    }

    pub fn evaluations_used(&self) -> u64 {
        self.evaluations_used
    }

    pub fn cost_used(&self) -> f64 {
        self.cost_used
    }

    /// Sum of recorded evaluation time.
    pub fn total_time_elapsed(&self) -> Duration {
        self.time_used
    }

    /// Wall-clock time since construction or the last reset.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn current_generation(&self) -> u64 {
        self.current_generation
    }

    pub fn carryover(&self) -> u64 {
        self.carryover
    }

    /// Per-generation records, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &GenerationRecord> {
        self.history.iter()
    }

    /// Zeroes all counters and history; limits are preserved.
    pub fn reset(&mut self) {
        self.evaluations_used = 0;
        self.cost_used = 0.0;
        self.time_used = Duration::ZERO;
        self.current_generation = 0;
        self.carryover = 0;
        self.history.clear();
        self.started_at = Instant::now();
        self.exhaustion_reported = false;
    }
}

// ============================================================================
// Tests
// ============================================================================
