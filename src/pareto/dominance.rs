//! Pareto dominance, non-dominated sorting and crowding distance.
//!
//! All objective vectors handled here are normalized so that **higher is
//! better** in every component (see [`Objective::normalize`]).
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"
//!
//! [`Objective::normalize`]: super::Objective::normalize

use std::collections::{BTreeMap, HashMap};

use crate::population::{Candidate, CandidateId};

/// Result of non-dominated sorting over raw objective vectors.
///
/// `ranks[i]` is the 1-based Pareto rank of solution `i`; rank 1 is the
/// Pareto-optimal set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NondominatedSortResult {
    pub ranks: Vec<usize>,

    /// Indices grouped by front: `fronts[0]` holds the rank-1 indices.
    pub fronts: Vec<Vec<usize>>,
}

/// Returns `true` when `a` dominates `b`: at least as good in every
/// objective and strictly better in one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (&va, &vb) in a.iter().zip(b.iter()) {
        if va < vb {
            return false;
        }
        if va > vb {
            strictly_better = true;
        }
    }
    strictly_better
}

/// For each solution, the indices of the solutions it dominates.
#[cfg(not(feature = "parallel"))]
fn dominated_sets(objectives: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&objectives[i], &objectives[j]) {
                dominated_by[i].push(j);
            } else if dominates(&objectives[j], &objectives[i]) {
                dominated_by[j].push(i);
            }
        }
    }
    dominated_by
}

#[cfg(feature = "parallel")]
fn dominated_sets(objectives: &[Vec<f64>]) -> Vec<Vec<usize>> {
    use rayon::prelude::*;

    let n = objectives.len();
    (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && dominates(&objectives[i], &objectives[j]))
                .collect()
        })
        .collect()
}

/// Fast non-dominated sorting (Deb et al., 2002).
///
/// 1. Count, for every solution, how many others dominate it
/// 2. Solutions with zero dominators form rank 1
/// 3. Remove that rank, decrement the counts it contributed, repeat
///
/// O(m * n²) for m objectives and n solutions. Empty input yields an
/// empty result.
pub fn non_dominated_sort(objectives: &[Vec<f64>]) -> NondominatedSortResult {
    let n = objectives.len();
    if n == 0 {
        return NondominatedSortResult::default();
    }

    let dominated_by = dominated_sets(objectives);
    let mut domination_count = vec![0usize; n];
    for dominated in &dominated_by {
        for &j in dominated {
            domination_count[j] += 1;
        }
    }

    let mut ranks = vec![0usize; n];
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    let mut fronts = Vec::new();

    while !current.is_empty() {
        let rank = fronts.len() + 1;
        let mut next_front = Vec::new();
        for &i in &current {
            ranks[i] = rank;
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next_front.push(j);
                }
            }
        }
        fronts.push(current);
        current = next_front;
    }

    NondominatedSortResult { ranks, fronts }
}

/// Crowding distance of each solution within one front.
///
/// For each objective the members are sorted by value; the two boundary
/// members get `f64::INFINITY` and interior members accumulate the
/// normalized gap between their neighbors. Fronts of one or two members
/// are all boundary.
pub fn crowding_distance(objectives: &[Vec<f64>]) -> Vec<f64> {
    let n = objectives.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let m = objectives[0].len();
    let mut distances = vec![0.0f64; n];

    #[allow(clippy::needless_range_loop)] // obj_idx is a column index into 2D data
    for obj_idx in 0..m {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.sort_by(|&a, &b| {
            objectives[a][obj_idx]
                .partial_cmp(&objectives[b][obj_idx])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        distances[indices[0]] = f64::INFINITY;
        distances[indices[n - 1]] = f64::INFINITY;

        let min_val = objectives[indices[0]][obj_idx];
        let max_val = objectives[indices[n - 1]][obj_idx];
        let range = max_val - min_val;

        if range > 0.0 {
            for i in 1..(n - 1) {
                let prev = objectives[indices[i - 1]][obj_idx];
                let next = objectives[indices[i + 1]][obj_idx];
                distances[indices[i]] += (next - prev) / range;
            }
        }
    }

    distances
}

/// Ranks candidates by their normalized objective values.
///
/// A pure function of the candidates passed in; it holds only the list of
/// objective names to read.
#[derive(Debug, Clone, Default)]
pub struct DominanceComparator {
    objectives: Vec<String>,
}

impl DominanceComparator {
    pub fn new<I, S>(objectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            objectives: objectives.into_iter().map(Into::into).collect(),
        }
    }

    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    fn vectors(&self, candidates: &[Candidate]) -> Vec<Vec<f64>> {
        candidates
            .iter()
            .map(|c| c.objective_vector(&self.objectives))
            .collect()
    }

    /// `true` when `a` dominates `b` under this comparator's objectives.
    pub fn candidate_dominates(&self, a: &Candidate, b: &Candidate) -> bool {
        dominates(
            &a.objective_vector(&self.objectives),
            &b.objective_vector(&self.objectives),
        )
    }

    /// Groups candidates into Pareto fronts keyed by 1-based rank.
    ///
    /// Every candidate appears in exactly one rank; within a rank the input
    /// order is kept.
    pub fn fast_non_dominated_sort(&self, candidates: &[Candidate]) -> BTreeMap<usize, Vec<Candidate>> {
        let result = non_dominated_sort(&self.vectors(candidates));
        result
            .fronts
            .iter()
            .enumerate()
            .map(|(idx, front)| {
                let mut members = front.clone();
                members.sort_unstable();
                (
                    idx + 1,
                    members.into_iter().map(|i| candidates[i].clone()).collect(),
                )
            })
            .collect()
    }

    /// Crowding distance per candidate within `front`.
    pub fn crowding_distance(&self, front: &[Candidate]) -> HashMap<CandidateId, f64> {
        let distances = crowding_distance(&self.vectors(front));
        front
            .iter()
            .zip(distances)
            .map(|(c, d)| (c.id.clone(), d))
            .collect()
    }

    /// Orders candidates best-first: by rank, then by crowding distance
    /// (larger first) within a rank.
    pub fn rank_order(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        let mut ordered = Vec::with_capacity(candidates.len());
        for (_, mut front) in self.fast_non_dominated_sort(candidates) {
            let distances = self.crowding_distance(&front);
            front.sort_by(|a, b| {
                let da = distances.get(&a.id).copied().unwrap_or(0.0);
                let db = distances.get(&b.id).copied().unwrap_or(0.0);
                db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
            });
            ordered.extend(front);
        }
        ordered
    }

    /// Keeps the best `count` candidates, truncating the last admitted
    /// front by crowding distance.
    pub fn select(&self, candidates: &[Candidate], count: usize) -> Vec<Candidate> {
        let mut ordered = self.rank_order(candidates);
        ordered.truncate(count);
        ordered
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: &str, values: &[(&str, f64)]) -> Candidate {
        let mut c = Candidate::new(format!("prompt {id}")).with_id(id);
        for (name, v) in values {
            c.normalized_objectives.insert((*name).to_string(), *v);
        }
        c
    }

    // ---- Dominance ----

    #[test]
    fn test_dominates_requires_strict_improvement() {
        assert!(dominates(&[0.9, 0.5], &[0.8, 0.5]));
        assert!(!dominates(&[0.8, 0.5], &[0.8, 0.5]));
        assert!(!dominates(&[0.9, 0.4], &[0.8, 0.5]));
    }

    // ---- Non-dominated sort ----

    #[test]
    fn test_empty_input() {
        let result = non_dominated_sort(&[]);
        assert!(result.ranks.is_empty());
        assert!(result.fronts.is_empty());
    }

    #[test]
    fn test_single_solution() {
        let result = non_dominated_sort(&[vec![0.5, 0.5]]);
        assert_eq!(result.ranks, vec![1]);
        assert_eq!(result.fronts, vec![vec![0]]);
    }

    #[test]
    fn test_clear_dominance_chain() {
        let objs = vec![vec![0.9, 0.9], vec![0.5, 0.5], vec![0.1, 0.1]];
        let result = non_dominated_sort(&objs);
        assert_eq!(result.ranks, vec![1, 2, 3]);
        assert_eq!(result.fronts.len(), 3);
    }

    #[test]
    fn test_mixed_fronts() {
        let objs = vec![
            vec![0.9, 0.1], // front 1
            vec![0.5, 0.5], // front 1
            vec![0.1, 0.9], // front 1
            vec![0.4, 0.4], // dominated by [1]
            vec![0.0, 0.0], // dominated by [3]
        ];
        let result = non_dominated_sort(&objs);
        assert_eq!(result.ranks, vec![1, 1, 1, 2, 3]);
    }

    #[test]
    fn test_identical_solutions_share_rank() {
        let objs = vec![vec![0.3, 0.3]; 3];
        let result = non_dominated_sort(&objs);
        assert!(result.ranks.iter().all(|&r| r == 1));
    }

    // ---- Crowding distance ----

    #[test]
    fn test_crowding_small_fronts_are_boundary() {
        assert!(crowding_distance(&[vec![0.1, 0.2]])[0].is_infinite());
        let two = crowding_distance(&[vec![0.1, 0.9], vec![0.9, 0.1]]);
        assert!(two.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_crowding_evenly_spaced() {
        let objs = vec![
            vec![0.0, 1.0],
            vec![0.25, 0.75],
            vec![0.5, 0.5],
            vec![0.75, 0.25],
            vec![1.0, 0.0],
        ];
        let dist = crowding_distance(&objs);
        assert!(dist[0].is_infinite());
        assert!(dist[4].is_infinite());
        assert!((dist[1] - dist[2]).abs() < 1e-10);
        assert!((dist[2] - dist[3]).abs() < 1e-10);
        assert!((dist[2] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_crowding_zero_range_objective() {
        let objs = vec![vec![0.1, 0.5], vec![0.2, 0.5], vec![0.3, 0.5]];
        let dist = crowding_distance(&objs);
        assert!(dist[1].is_finite());
    }

    // ---- Candidate-level comparator ----

    #[test]
    fn test_comparator_groups_by_rank() {
        let cmp = DominanceComparator::new(["accuracy", "brevity"]);
        let cands = vec![
            candidate("a", &[("accuracy", 0.9), ("brevity", 0.2)]),
            candidate("b", &[("accuracy", 0.4), ("brevity", 0.8)]),
            candidate("c", &[("accuracy", 0.3), ("brevity", 0.1)]),
        ];
        let fronts = cmp.fast_non_dominated_sort(&cands);
        let rank1: Vec<&str> = fronts[&1].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(rank1, vec!["a", "b"]);
        assert_eq!(fronts[&2][0].id.as_str(), "c");
        assert!(cmp.candidate_dominates(&cands[0], &cands[2]));
    }

    #[test]
    fn test_comparator_crowding_keyed_by_id() {
        let cmp = DominanceComparator::new(["x", "y"]);
        let front = vec![
            candidate("left", &[("x", 0.0), ("y", 1.0)]),
            candidate("mid", &[("x", 0.5), ("y", 0.5)]),
            candidate("right", &[("x", 1.0), ("y", 0.0)]),
        ];
        let d = cmp.crowding_distance(&front);
        assert!(d[&CandidateId::from("left")].is_infinite());
        assert!(d[&CandidateId::from("mid")].is_finite());
    }

    #[test]
    fn test_select_truncates_last_front_by_crowding() {
        let cmp = DominanceComparator::new(["x", "y"]);
        let cands = vec![
            candidate("mid", &[("x", 0.5), ("y", 0.5)]),
            candidate("left", &[("x", 0.0), ("y", 1.0)]),
            candidate("right", &[("x", 1.0), ("y", 0.0)]),
            candidate("near", &[("x", 0.45), ("y", 0.52)]),
        ];
        let picked = cmp.select(&cands, 2);
        let ids: Vec<&str> = picked.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"left"));
        assert!(ids.contains(&"right"));
    }

    proptest! {
        #[test]
        fn prop_rank_one_is_non_dominated_and_ranks_partition(
            points in prop::collection::vec(prop::collection::vec(0.0f64..1.0, 2..4), 1..30)
        ) {
            let m = points[0].len();
            let objs: Vec<Vec<f64>> = points.into_iter().map(|mut p| { p.resize(m, 0.5); p }).collect();
            let result = non_dominated_sort(&objs);

            let mut seen = vec![0usize; objs.len()];
            for front in &result.fronts {
                for &i in front {
                    seen[i] += 1;
                }
            }
            prop_assert!(seen.iter().all(|&s| s == 1));

            for &i in &result.fronts[0] {
                for j in 0..objs.len() {
                    prop_assert!(!dominates(&objs[j], &objs[i]));
                }
            }
        }
    }
}
