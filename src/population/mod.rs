//! Candidate population management.
//!
//! A [`Population`] is a fixed-capacity set of [`Candidate`] prompts with
//! a replacement policy (a better-scoring arrival evicts the worst
//! evaluated incumbent), cached aggregate statistics, a generation
//! counter, and versioned binary snapshots via
//! [`save`](Population::save) / [`load`](Population::load).
//!
//! `Population` itself is a plain `&mut self` structure; callers that share
//! it across tasks serialize mutations behind a lock, as the optimizer
//! does.

mod candidate;
mod snapshot;
mod store;

pub use candidate::{Candidate, CandidateId, CandidateMetadata, Origin};
pub use snapshot::SNAPSHOT_VERSION;
pub use store::{Population, PopulationStats};
