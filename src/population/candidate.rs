//! Candidate prompts and their lineage metadata.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identity of a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(String);

impl CandidateId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a candidate came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Origin {
    /// Supplied by the caller as a seed prompt.
    #[default]
    Seed,
    /// Generated from a seed to fill the initial population.
    Variant,
    /// Produced by applying reflection edits to a parent.
    Mutation,
    /// Produced by recombining two parents.
    Crossover,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::Seed => "seed",
            Origin::Variant => "variant",
            Origin::Mutation => "mutation",
            Origin::Crossover => "crossover",
        };
        f.write_str(name)
    }
}

/// Free-form lineage information attached to a candidate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub origin: Origin,
    /// Parent ids; empty for seeds, one for mutations, two for crossover.
    pub parents: Vec<CandidateId>,
    /// Mutation rate in effect when the candidate was produced.
    pub mutation_rate: Option<f64>,
    pub notes: BTreeMap<String, String>,
}

/// A prompt text plus its scores and lineage.
///
/// Fitness, objective scores and the evaluation timestamp are the only
/// fields that change after construction; they are written once per
/// evaluation pass through [`Population`](super::Population).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub prompt: String,
    pub fitness: Option<f64>,
    /// Raw objective values keyed by objective name.
    pub objectives: BTreeMap<String, f64>,
    /// Objective values rescaled to [0, 1], higher is better.
    pub normalized_objectives: BTreeMap<String, f64>,
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    /// Creates an unevaluated seed candidate with a fresh id.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: CandidateId::generate(),
            prompt: prompt.into(),
            fitness: None,
            objectives: BTreeMap::new(),
            normalized_objectives: BTreeMap::new(),
            generation: 0,
            created_at: Utc::now(),
            evaluated_at: None,
            metadata: CandidateMetadata::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<CandidateId>) -> Self {
        self.id = id.into();
        self
    }

    /// Presets the fitness, marking the candidate as evaluated.
    pub fn with_fitness(mut self, fitness: f64) -> Self {
        self.fitness = Some(fitness);
        self.evaluated_at = Some(Utc::now());
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_origin(mut self, origin: Origin, parents: Vec<CandidateId>) -> Self {
        self.metadata.origin = origin;
        self.metadata.parents = parents;
        self
    }

    pub fn with_metadata(mut self, metadata: CandidateMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Normalized objective values in the order of `names`.
    ///
    /// Missing objectives read as 0.0, the worst normalized value.
    pub fn objective_vector(&self, names: &[String]) -> Vec<f64> {
        names
            .iter()
            .map(|name| {
                self.normalized_objectives
                    .get(name)
                    .copied()
                    .unwrap_or(0.0)
            })
            .collect()
    }
}
