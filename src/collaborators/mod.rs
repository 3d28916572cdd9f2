//! Interfaces to the collaborators the engine drives but does not own.
//!
//! - [`Evaluator`]: scores a prompt against the task descriptor
//! - [`Reflector`]: turns an evaluation trajectory into an [`EditPlan`]
//! - [`Crossover`]: recombines two prompt texts into offspring
//! - [`DiversityMetrics`]: summarizes how varied a set of prompts is
//!
//! The asynchronous collaborators are typically LLM-backed; they must be
//! safe to call from many tasks at once. [`SentenceCrossover`] and
//! [`TextDiversity`] are dependency-free defaults used when the caller does
//! not supply its own.

mod defaults;
mod edits;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CollaboratorError, EvaluationError};

pub use defaults::{SentenceCrossover, TextDiversity};
pub use edits::{Edit, EditOperation, EditPlan};

/// Opaque task descriptor handed verbatim to the evaluator.
pub type TaskDescriptor = serde_json::Value;

/// Record of what happened while a prompt was evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub steps: Vec<String>,
    /// Evaluator feedback on failures, consumed by reflection.
    pub feedback: String,
}

/// A successful evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Scalar quality score in [0, 1].
    pub fitness: f64,
    pub trajectory: Trajectory,
    /// Named metric values; multi-objective runs read objectives from here.
    pub metrics: BTreeMap<String, f64>,
    /// Monetary cost of the evaluation, charged to the budget.
    pub cost: f64,
}

impl Evaluation {
    pub fn with_fitness(fitness: f64) -> Self {
        Self {
            fitness,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_trajectory(mut self, trajectory: Trajectory) -> Self {
        self.trajectory = trajectory;
        self
    }
}

/// Runs a prompt against a task and scores it.
///
/// Implementations must be callable concurrently and should give up once
/// `timeout` elapses; the scheduler enforces the same deadline regardless.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        prompt: &str,
        task: &TaskDescriptor,
        timeout: Duration,
    ) -> Result<Evaluation, EvaluationError>;
}

/// Proposes edits to a prompt from the trajectory of its evaluation.
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn generate_edits(
        &self,
        prompt: &str,
        trajectory: &Trajectory,
    ) -> Result<EditPlan, CollaboratorError>;
}

/// Combines two prompts into one or more offspring prompts.
#[async_trait]
pub trait Crossover: Send + Sync {
    async fn combine(&self, prompt_a: &str, prompt_b: &str)
        -> Result<Vec<String>, CollaboratorError>;
}

/// Coarse diversity classification, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiversityLevel {
    Critical,
    Low,
    Moderate,
    Healthy,
    Excellent,
}

/// Diversity summary of a set of prompts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiversitySnapshot {
    pub level: DiversityLevel,
    /// Mean pairwise distance in [0, 1].
    pub pairwise_diversity: f64,
}

/// Computes a diversity snapshot for a set of prompts.
pub trait DiversityMetrics: Send + Sync {
    fn calculate(&self, prompts: &[&str]) -> DiversitySnapshot;
}
