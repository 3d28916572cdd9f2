//! Multi-resource budget tracking.
//!
//! [`BudgetManager`] keeps cumulative counters for evaluations, cost and
//! recorded time, checks them against optional limits, and optionally
//! hands out a fixed evaluation allocation per generation with carryover
//! of the previous generation's unused allocation.

mod config;
mod manager;

pub use config::BudgetConfig;
pub use manager::{BudgetManager, Consumption, GenerationRecord, Remaining};
