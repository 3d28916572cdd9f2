//! Named optimization objectives.

use serde::{Deserialize, Serialize};

/// Direction of optimization for an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    /// Higher is better (e.g. accuracy).
    #[default]
    Maximize,
    /// Lower is better (e.g. tokens, latency).
    Minimize,
}

/// An objective read from the evaluator's metrics by name.
///
/// The name `"fitness"` refers to the scalar fitness itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Objective {
    pub fn maximize(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Maximize,
        }
    }

    pub fn minimize(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Minimize,
        }
    }

    /// Rescales `value` into [0, 1] given the observed range, so that
    /// higher always means better.
    ///
    /// A degenerate range (all values equal) maps to 1.0.
    pub fn normalize(&self, value: f64, min: f64, max: f64) -> f64 {
        let range = max - min;
        if !(range > 0.0) {
            return 1.0;
        }
        let scaled = ((value - min) / range).clamp(0.0, 1.0);
        match self.direction {
            Direction::Maximize => scaled,
            Direction::Minimize => 1.0 - scaled,
        }
    }
}
