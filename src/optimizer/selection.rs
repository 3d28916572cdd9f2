//! Parent selection strategies.
//!
//! Selection picks parents for crossover and mutation from the ranked
//! survivors of a generation. Scores are **higher-is-better**: either the
//! raw fitness, or a rank-derived score in multi-objective runs.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Baker (1985), "Adaptive Selection Methods for Genetic Algorithms"

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Selection strategy for choosing parents.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use u_gepa::optimizer::Selection;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let scores = [0.2, 0.9, 0.5];
/// let idx = Selection::Tournament(3).select(&scores, &mut rng).unwrap();
/// assert!(idx < scores.len());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Pick `k` candidates at random, keep the best.
    ///
    /// - k=2: light pressure
    /// - k=3-5: moderate pressure (typical default)
    /// - k>5: strong pressure, risks premature convergence
    Tournament(usize),

    /// Fitness-proportionate selection over `score - min + ε`.
    Roulette,

    /// Linear ranking: weight `n - rank`, best rank 0.
    Rank,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Selects an index into `scores`, or `None` when `scores` is empty.
    pub fn select<R: Rng>(&self, scores: &[f64], rng: &mut R) -> Option<usize> {
        if scores.is_empty() {
            return None;
        }
        Some(match self {
            Selection::Tournament(k) => tournament(scores, *k, rng),
            Selection::Roulette => roulette(scores, rng),
            Selection::Rank => rank(scores, rng),
        })
    }
}

fn tournament<R: Rng>(scores: &[f64], k: usize, rng: &mut R) -> usize {
    let k = k.max(1);
    let n = scores.len();

    let mut best_idx = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if scores[idx] > scores[best_idx] {
            best_idx = idx;
        }
    }
    best_idx
}

/// Shifts scores so the worst gets weight ε and the rest scale linearly.
fn roulette<R: Rng>(scores: &[f64], rng: &mut R) -> usize {
    let n = scores.len();
    if n == 1 {
        return 0;
    }

    let min_score = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let epsilon = 1e-10;
    let weights: Vec<f64> = scores
        .iter()
        .map(|&s| {
            let w = s - min_score + epsilon;
            if w.is_finite() && w > 0.0 {
                w
            } else {
                epsilon
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return rng.random_range(0..n);
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }

    n - 1 // floating-point fallback
}

fn rank<R: Rng>(scores: &[f64], rng: &mut R) -> usize {
    let n = scores.len();
    if n == 1 {
        return 0;
    }

    // best first
    let mut indexed: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (rank, &(original_idx, _)) in indexed.iter().enumerate() {
        cumulative += (n - rank) as f64;
        if cumulative > threshold {
            return original_idx;
        }
    }

    indexed[n - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn counts(selection: Selection, scores: &[f64], draws: usize) -> Vec<u32> {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = vec![0u32; scores.len()];
        for _ in 0..draws {
            let idx = selection.select(scores, &mut rng).unwrap();
            counts[idx] += 1;
        }
        counts
    }

    #[test]
    fn test_tournament_favors_best() {
        let counts = counts(Selection::Tournament(4), &[0.1, 0.5, 0.9, 0.2], 10_000);
        assert!(
            counts[2] > 6000,
            "expected best to be selected >60% of the time, got {counts:?}"
        );
    }

    #[test]
    fn test_tournament_size_1_is_random() {
        let counts = counts(Selection::Tournament(1), &[0.1, 0.5, 0.9, 0.2], 10_000);
        for &c in &counts {
            assert!(c > 1500, "expected uniform, got counts: {counts:?}");
        }
    }

    #[test]
    fn test_roulette_favors_best() {
        let counts = counts(Selection::Roulette, &[0.0, 0.5, 1.0, 0.2], 10_000);
        assert!(counts[2] > counts[1]);
        assert!(counts[1] > counts[0]);
    }

    #[test]
    fn test_rank_favors_best() {
        let counts = counts(Selection::Rank, &[0.01, 0.5, 0.99, 0.2], 10_000);
        assert!(counts[2] > counts[0], "counts: {counts:?}");
    }

    #[test]
    fn test_equal_scores_roughly_uniform() {
        for selection in [Selection::Tournament(2), Selection::Roulette] {
            let counts = counts(selection, &[0.5, 0.5, 0.5, 0.5], 10_000);
            for &c in &counts {
                assert!(c > 1500, "{selection:?}: {counts:?}");
            }
        }
    }

    #[test]
    fn test_single_and_empty() {
        let mut rng = StdRng::seed_from_u64(42);
        for selection in [Selection::Tournament(3), Selection::Roulette, Selection::Rank] {
            assert_eq!(selection.select(&[0.4], &mut rng), Some(0));
            assert_eq!(selection.select(&[], &mut rng), None);
        }
    }
}
