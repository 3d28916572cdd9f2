//! Optimizer states, run results and per-generation metrics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::Remaining;
use crate::collaborators::DiversityLevel;
use crate::population::{Candidate, CandidateId, CandidateMetadata};

/// Number of prompts returned by default from a finished run.
pub const DEFAULT_BEST_PROMPTS: usize = 5;

/// Lifecycle of an [`Optimizer`](super::Optimizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerState {
    Initializing,
    Ready,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for OptimizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerState::Initializing => "initializing",
            OptimizerState::Ready => "ready",
            OptimizerState::Running => "running",
            OptimizerState::Completed => "completed",
            OptimizerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why the generation loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    MaxGenerationsReached,
    BudgetExhausted,
    Converged,
    /// [`Optimizer::stop`](super::Optimizer::stop) was called.
    Stopped,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::MaxGenerationsReached => "maxGenerationsReached",
            StopReason::BudgetExhausted => "budgetExhausted",
            StopReason::Converged => "converged",
            StopReason::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Snapshot recorded at the end of every generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub generation: u64,
    pub best_fitness: Option<f64>,
    pub average_fitness: Option<f64>,
    /// Distinct prompt ratio of the population.
    pub diversity: f64,
    pub diversity_level: DiversityLevel,
    pub pairwise_diversity: f64,
    pub mutation_rate: f64,
    /// Evaluator calls made in this generation.
    pub evaluations: u64,
    pub failed_evaluations: u64,
    /// Cumulative evaluator calls including this generation.
    pub total_evaluations: u64,
    pub timestamp: DateTime<Utc>,
}

/// A ranked prompt returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPrompt {
    pub id: CandidateId,
    pub prompt: String,
    pub fitness: f64,
    pub generation: u64,
    pub metadata: CandidateMetadata,
}

impl BestPrompt {
    /// `None` for unevaluated candidates.
    pub(crate) fn from_candidate(candidate: &Candidate) -> Option<Self> {
        Some(Self {
            id: candidate.id.clone(),
            prompt: candidate.prompt.clone(),
            fitness: candidate.fitness?,
            generation: candidate.generation,
            metadata: candidate.metadata.clone(),
        })
    }
}

/// Outcome of [`Optimizer::optimize`](super::Optimizer::optimize).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best first.
    pub best_prompts: Vec<BestPrompt>,
    pub final_generation: u64,
    pub total_evaluations: u64,
    /// Chronological, one entry per completed generation.
    pub history: Vec<GenerationMetrics>,
    pub duration_ms: u64,
    pub stop_reason: StopReason,
}

impl OptimizationResult {
    pub fn best(&self) -> Option<&BestPrompt> {
        self.best_prompts.first()
    }
}

/// Point-in-time view of an optimizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerStatus {
    pub state: OptimizerState,
    pub generation: u64,
    pub population_size: usize,
    pub evaluations_used: u64,
    pub evaluations_remaining: Remaining<u64>,
    pub best_fitness: Option<f64>,
    pub uptime_ms: u64,
}
