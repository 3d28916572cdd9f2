//! Multi-objective ranking.
//!
//! NSGA-II style non-dominated sorting and crowding distance over
//! candidates whose objective scores have been normalized to [0, 1],
//! higher is better.
//!
//! - [`non_dominated_sort`] / [`crowding_distance`]: index-level algorithms
//!   over raw objective vectors
//! - [`DominanceComparator`]: the same algorithms over [`Candidate`]s,
//!   used by the optimizer to order survivors in multi-objective runs
//!
//! [`Candidate`]: crate::population::Candidate

mod dominance;
mod objective;

pub use dominance::{
    crowding_distance, dominates, non_dominated_sort, DominanceComparator,
    NondominatedSortResult,
};
pub use objective::{Direction, Objective};
