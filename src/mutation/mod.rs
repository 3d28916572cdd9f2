//! Mutation-rate scheduling.
//!
//! The [`MutationScheduler`] decides how aggressively the optimizer explores
//! in each generation. Four strategies are available plus a manual override:
//!
//! | Strategy | Rate |
//! |----------|------|
//! | `Constant` | `base_rate` |
//! | `LinearDecay` | `max_rate` → `min_rate` over the run |
//! | `ExponentialDecay` | `max_rate · decay^gen` |
//! | `Adaptive` | `base_rate` ± stagnation, diversity and trend terms |
//!
//! All rates are clamped to `[min_rate, max_rate]`.

mod config;
mod scheduler;

pub use config::{MutationConfig, MutationStrategy};
pub use scheduler::MutationScheduler;
