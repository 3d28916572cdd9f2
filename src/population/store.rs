//! Capacity-bounded candidate storage.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::candidate::{Candidate, CandidateId};
use crate::error::PopulationError;
use crate::pareto::Objective;

/// Aggregate statistics over the current population contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub size: usize,
    pub capacity: usize,
    pub generation: u64,
    /// Number of candidates carrying a fitness score.
    pub evaluated: usize,
    pub best_fitness: Option<f64>,
    /// Mean fitness over evaluated candidates.
    pub average_fitness: Option<f64>,
    /// Distinct prompt texts / total candidates, in [0, 1].
    pub diversity: f64,
}

/// A fixed-capacity set of candidates.
///
/// Candidates are kept in insertion order. When full, a new candidate is
/// admitted only if its fitness strictly beats the worst evaluated
/// incumbent, which is then evicted. Statistics are recomputed on every
/// mutation so [`statistics`](Self::statistics) is always consistent.
///
/// # Examples
///
/// ```
/// use u_gepa::population::{Candidate, Population};
///
/// let mut pop = Population::new(2).unwrap();
/// pop.add_candidate(Candidate::new("a").with_fitness(0.3)).unwrap();
/// pop.add_candidate(Candidate::new("b").with_fitness(0.6)).unwrap();
///
/// // Full: 0.9 beats the worst (0.3), which is evicted.
/// let evicted = pop.add_candidate(Candidate::new("c").with_fitness(0.9)).unwrap();
/// assert_eq!(evicted.unwrap().prompt, "a");
/// assert_eq!(pop.statistics().best_fitness, Some(0.9));
/// ```
#[derive(Debug, Clone)]
pub struct Population {
    pub(super) capacity: usize,
    pub(super) candidates: HashMap<CandidateId, Candidate>,
    pub(super) order: Vec<CandidateId>,
    pub(super) generation: u64,
    pub(super) stats: PopulationStats,
}

impl Population {
    /// Creates an empty population holding at most `capacity` candidates.
    pub fn new(capacity: usize) -> Result<Self, PopulationError> {
        if capacity == 0 {
            return Err(PopulationError::InvalidCapacity);
        }
        let mut population = Self {
            capacity,
            candidates: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
            generation: 0,
            stats: PopulationStats::default(),
        };
        population.refresh_stats();
        Ok(population)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.capacity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Adds a candidate, evicting the worst evaluated incumbent when full.
    ///
    /// Returns the evicted candidate, if any.
    ///
    /// # Errors
    ///
    /// - [`PopulationError::DuplicateCandidate`] if the id is already live
    /// - [`PopulationError::PopulationFull`] at capacity when the candidate
    ///   has no fitness or does not strictly beat the worst incumbent
    pub fn add_candidate(
        &mut self,
        candidate: Candidate,
    ) -> Result<Option<Candidate>, PopulationError> {
        if self.candidates.contains_key(&candidate.id) {
            return Err(PopulationError::DuplicateCandidate(candidate.id));
        }

        let evicted = if self.is_full() {
            let capacity = self.capacity;
            let full = || PopulationError::PopulationFull { capacity };
            let incoming = candidate.fitness.ok_or_else(full)?;
            let (worst_id, worst_fitness) = self.worst_evaluated().ok_or_else(full)?;
            if incoming <= worst_fitness {
                return Err(full());
            }
            debug!(
                evicted = %worst_id,
                worst_fitness,
                incoming,
                "population full, evicting worst candidate"
            );
            self.detach(&worst_id)
        } else {
            None
        };

        self.order.push(candidate.id.clone());
        self.candidates.insert(candidate.id.clone(), candidate);
        self.refresh_stats();
        Ok(evicted)
    }

    /// Removes a candidate by id.
    pub fn remove_candidate(&mut self, id: &CandidateId) -> Result<Candidate, PopulationError> {
        let removed = self
            .detach(id)
            .ok_or_else(|| PopulationError::CandidateNotFound(id.clone()))?;
        self.refresh_stats();
        Ok(removed)
    }

    /// Swaps the candidate `id` for `replacement`, keeping its position in
    /// insertion order. Returns the replaced candidate.
    pub fn replace_candidate(
        &mut self,
        id: &CandidateId,
        replacement: Candidate,
    ) -> Result<Candidate, PopulationError> {
        if !self.candidates.contains_key(id) {
            return Err(PopulationError::CandidateNotFound(id.clone()));
        }
        if replacement.id != *id && self.candidates.contains_key(&replacement.id) {
            return Err(PopulationError::DuplicateCandidate(replacement.id));
        }

        let slot = self
            .order
            .iter()
            .position(|live| live == id)
            .ok_or_else(|| PopulationError::CandidateNotFound(id.clone()))?;
        let old = self
            .candidates
            .remove(id)
            .ok_or_else(|| PopulationError::CandidateNotFound(id.clone()))?;

        self.order[slot] = replacement.id.clone();
        self.candidates.insert(replacement.id.clone(), replacement);
        self.refresh_stats();
        Ok(old)
    }

    /// Sets the fitness of a candidate and stamps its evaluation time.
    pub fn update_fitness(&mut self, id: &CandidateId, score: f64) -> Result<(), PopulationError> {
        self.record_evaluation(id, score, BTreeMap::new())
    }

    /// Records a full evaluation result: fitness plus raw objective values.
    ///
    /// Normalized objective values are refreshed separately by
    /// [`normalize_objectives`](Self::normalize_objectives) because they
    /// depend on the whole population.
    pub fn record_evaluation(
        &mut self,
        id: &CandidateId,
        fitness: f64,
        objectives: BTreeMap<String, f64>,
    ) -> Result<(), PopulationError> {
        let candidate = self
            .candidates
            .get_mut(id)
            .ok_or_else(|| PopulationError::CandidateNotFound(id.clone()))?;
        candidate.fitness = Some(fitness);
        candidate.objectives = objectives;
        candidate.evaluated_at = Some(Utc::now());
        self.refresh_stats();
        Ok(())
    }

    /// Rescales raw objective values to [0, 1] (higher is better) over the
    /// evaluated candidates.
    pub fn normalize_objectives(&mut self, objectives: &[Objective]) {
        for objective in objectives {
            let values: Vec<f64> = self
                .candidates
                .values()
                .filter(|c| c.is_evaluated())
                .filter_map(|c| c.objectives.get(&objective.name).copied())
                .collect();
            if values.is_empty() {
                continue;
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            for candidate in self.candidates.values_mut() {
                if let Some(&raw) = candidate.objectives.get(&objective.name) {
                    candidate
                        .normalized_objectives
                        .insert(objective.name.clone(), objective.normalize(raw, min, max));
                }
            }
        }
    }

    pub fn get_candidate(&self, id: &CandidateId) -> Result<&Candidate, PopulationError> {
        self.candidates
            .get(id)
            .ok_or_else(|| PopulationError::CandidateNotFound(id.clone()))
    }

    /// All live candidates in insertion order.
    pub fn get_all(&self) -> Vec<&Candidate> {
        self.order
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .collect()
    }

    /// Evaluated candidates sorted by fitness, best first.
    ///
    /// Candidates below `min_fitness` are skipped; equal fitness keeps
    /// insertion order.
    pub fn get_best(&self, limit: usize, min_fitness: Option<f64>) -> Vec<&Candidate> {
        let mut evaluated: Vec<&Candidate> = self
            .get_all()
            .into_iter()
            .filter(|c| match (c.fitness, min_fitness) {
                (Some(f), Some(min)) => f >= min,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        evaluated.sort_by(|a, b| {
            b.fitness
                .partial_cmp(&a.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        evaluated.truncate(limit);
        evaluated
    }

    /// Ids of candidates still lacking a fitness score, in insertion order.
    pub fn unevaluated_ids(&self) -> Vec<CandidateId> {
        self.get_all()
            .into_iter()
            .filter(|c| !c.is_evaluated())
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn contains_prompt(&self, prompt: &str) -> bool {
        self.candidates.values().any(|c| c.prompt == prompt)
    }

    pub fn statistics(&self) -> &PopulationStats {
        &self.stats
    }

    /// Advances the generation counter and returns the new value.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.refresh_stats();
        self.generation
    }

    /// The evaluated candidate with the lowest fitness; the oldest wins ties.
    fn worst_evaluated(&self) -> Option<(CandidateId, f64)> {
        let mut worst: Option<(CandidateId, f64)> = None;
        for candidate in self.get_all() {
            if let Some(f) = candidate.fitness {
                match worst {
                    Some((_, w)) if f >= w => {}
                    _ => worst = Some((candidate.id.clone(), f)),
                }
            }
        }
        worst
    }

    /// Removes a candidate without refreshing statistics.
    fn detach(&mut self, id: &CandidateId) -> Option<Candidate> {
        let removed = self.candidates.remove(id)?;
        self.order.retain(|live| live != id);
        Some(removed)
    }

    pub(super) fn refresh_stats(&mut self) {
        let size = self.order.len();
        let fitnesses: Vec<f64> = self.get_all().iter().filter_map(|c| c.fitness).collect();

        let best_fitness = fitnesses.iter().copied().reduce(f64::max);
        let average_fitness = if fitnesses.is_empty() {
            None
        } else {
            Some(fitnesses.iter().sum::<f64>() / fitnesses.len() as f64)
        };
        let diversity = if size == 0 {
            0.0
        } else {
            let distinct: HashSet<&str> =
                self.candidates.values().map(|c| c.prompt.as_str()).collect();
            distinct.len() as f64 / size as f64
        };

        self.stats = PopulationStats {
            size,
            capacity: self.capacity,
            generation: self.generation,
            evaluated: fitnesses.len(),
            best_fitness,
            average_fitness,
            diversity,
        };
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pareto::Objective;
    use proptest::prelude::*;

    fn scored(id: &str, fitness: f64) -> Candidate {
        Candidate::new(format!("prompt {id}"))
            .with_id(id)
            .with_fitness(fitness)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            Population::new(0),
            Err(PopulationError::InvalidCapacity)
        ));
    }

    #[test]
    fn test_add_under_capacity() {
        let mut pop = Population::new(3).unwrap();
        assert!(pop.add_candidate(Candidate::new("x")).unwrap().is_none());
        assert_eq!(pop.len(), 1);
        assert_eq!(pop.statistics().evaluated, 0);
        assert_eq!(pop.statistics().best_fitness, None);
    }

    #[test]
    fn test_eviction_scenario() {
        let mut pop = Population::new(3).unwrap();
        pop.add_candidate(scored("a", 0.3)).unwrap();
        pop.add_candidate(scored("b", 0.6)).unwrap();
        pop.add_candidate(scored("c", 0.9)).unwrap();

        let evicted = pop.add_candidate(scored("d", 0.95)).unwrap();
        assert_eq!(evicted.unwrap().id.as_str(), "a");
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.statistics().best_fitness, Some(0.95));

        let err = pop.add_candidate(scored("e", 0.1)).unwrap_err();
        assert!(matches!(err, PopulationError::PopulationFull { capacity: 3 }));
        assert_eq!(pop.len(), 3);
    }

    #[test]
    fn test_full_rejects_unscored_and_equal() {
        let mut pop = Population::new(1).unwrap();
        pop.add_candidate(scored("a", 0.5)).unwrap();
        assert!(pop.add_candidate(Candidate::new("new")).is_err());
        assert!(pop.add_candidate(scored("b", 0.5)).is_err());
    }

    #[test]
    fn test_full_of_unevaluated_rejects_everything() {
        let mut pop = Population::new(1).unwrap();
        pop.add_candidate(Candidate::new("a")).unwrap();
        assert!(pop.add_candidate(scored("b", 1.0)).is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut pop = Population::new(3).unwrap();
        pop.add_candidate(scored("a", 0.1)).unwrap();
        assert!(matches!(
            pop.add_candidate(scored("a", 0.2)),
            Err(PopulationError::DuplicateCandidate(_))
        ));
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut pop = Population::new(3).unwrap();
        pop.add_candidate(scored("a", 0.1)).unwrap();
        let id = CandidateId::from("a");
        assert_eq!(pop.get_candidate(&id).unwrap().fitness, Some(0.1));
        pop.remove_candidate(&id).unwrap();
        assert!(pop.is_empty());
        assert!(matches!(
            pop.remove_candidate(&id),
            Err(PopulationError::CandidateNotFound(_))
        ));
        assert!(pop.get_candidate(&id).is_err());
    }

    #[test]
    fn test_replace_keeps_slot() {
        let mut pop = Population::new(3).unwrap();
        pop.add_candidate(scored("a", 0.1)).unwrap();
        pop.add_candidate(scored("b", 0.2)).unwrap();
        pop.add_candidate(scored("c", 0.3)).unwrap();

        let old = pop
            .replace_candidate(&CandidateId::from("b"), scored("z", 0.8))
            .unwrap();
        assert_eq!(old.id.as_str(), "b");
        let ids: Vec<&str> = pop.get_all().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "c"]);
        assert_eq!(pop.statistics().best_fitness, Some(0.8));
    }

    #[test]
    fn test_replace_rejects_duplicate_replacement() {
        let mut pop = Population::new(3).unwrap();
        pop.add_candidate(scored("a", 0.1)).unwrap();
        pop.add_candidate(scored("b", 0.2)).unwrap();
        assert!(matches!(
            pop.replace_candidate(&CandidateId::from("a"), scored("b", 0.9)),
            Err(PopulationError::DuplicateCandidate(_))
        ));
    }

    #[test]
    fn test_update_fitness_refreshes_stats() {
        let mut pop = Population::new(3).unwrap();
        pop.add_candidate(Candidate::new("p").with_id("a")).unwrap();
        pop.add_candidate(scored("b", 0.2)).unwrap();
        pop.update_fitness(&CandidateId::from("a"), 0.6).unwrap();

        let stats = pop.statistics();
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.best_fitness, Some(0.6));
        assert!((stats.average_fitness.unwrap() - 0.4).abs() < 1e-12);
        assert!(pop
            .get_candidate(&CandidateId::from("a"))
            .unwrap()
            .evaluated_at
            .is_some());
    }

    #[test]
    fn test_get_best_sorted_filtered_truncated() {
        let mut pop = Population::new(5).unwrap();
        pop.add_candidate(scored("a", 0.2)).unwrap();
        pop.add_candidate(scored("b", 0.9)).unwrap();
        pop.add_candidate(Candidate::new("unscored")).unwrap();
        pop.add_candidate(scored("c", 0.5)).unwrap();

        let best: Vec<&str> = pop.get_best(10, None).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(best, vec!["b", "c", "a"]);

        let filtered: Vec<&str> = pop
            .get_best(10, Some(0.4))
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(filtered, vec!["b", "c"]);

        assert_eq!(pop.get_best(1, None).len(), 1);
    }

    #[test]
    fn test_diversity_counts_distinct_prompts() {
        let mut pop = Population::new(4).unwrap();
        pop.add_candidate(Candidate::new("same")).unwrap();
        pop.add_candidate(Candidate::new("same")).unwrap();
        pop.add_candidate(Candidate::new("other")).unwrap();
        pop.add_candidate(Candidate::new("third")).unwrap();
        assert!((pop.statistics().diversity - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_next_generation() {
        let mut pop = Population::new(2).unwrap();
        assert_eq!(pop.next_generation(), 1);
        assert_eq!(pop.next_generation(), 2);
        assert_eq!(pop.statistics().generation, 2);
    }

    #[test]
    fn test_unevaluated_ids_in_order() {
        let mut pop = Population::new(4).unwrap();
        pop.add_candidate(Candidate::new("p").with_id("x")).unwrap();
        pop.add_candidate(scored("y", 0.3)).unwrap();
        pop.add_candidate(Candidate::new("q").with_id("z")).unwrap();
        assert_eq!(
            pop.unevaluated_ids(),
            vec![CandidateId::from("x"), CandidateId::from("z")]
        );
    }

    #[test]
    fn test_normalize_objectives() {
        let mut pop = Population::new(3).unwrap();
        for (id, acc, lat) in [("a", 0.2, 100.0), ("b", 0.6, 300.0), ("c", 1.0, 200.0)] {
            pop.add_candidate(Candidate::new(id).with_id(id)).unwrap();
            let objectives = BTreeMap::from([
                ("accuracy".to_string(), acc),
                ("latency".to_string(), lat),
            ]);
            pop.record_evaluation(&CandidateId::from(id), acc, objectives)
                .unwrap();
        }
        pop.normalize_objectives(&[Objective::maximize("accuracy"), Objective::minimize("latency")]);

        let a = pop.get_candidate(&CandidateId::from("a")).unwrap();
        assert!((a.normalized_objectives["accuracy"] - 0.0).abs() < 1e-12);
        assert!((a.normalized_objectives["latency"] - 1.0).abs() < 1e-12);
        let c = pop.get_candidate(&CandidateId::from("c")).unwrap();
        assert!((c.normalized_objectives["accuracy"] - 1.0).abs() < 1e-12);
        assert!((c.normalized_objectives["latency"] - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_eviction_replaces_worst_and_respects_capacity(
            capacity in 1usize..8,
            fitnesses in prop::collection::vec(prop::option::of(0.0f64..1.0), 0..40)
        ) {
            let mut pop = Population::new(capacity).unwrap();
            for (i, f) in fitnesses.into_iter().enumerate() {
                let mut c = Candidate::new(format!("p{i}"));
                if let Some(f) = f {
                    c = c.with_fitness(f);
                }
                let incoming_id = c.id.clone();
                let before = pop.len();
                let worst_before = pop
                    .get_all()
                    .iter()
                    .filter_map(|c| c.fitness)
                    .min_by(f64::total_cmp);
                match pop.add_candidate(c) {
                    Ok(Some(evicted)) => {
                        prop_assert_eq!(pop.len(), before);
                        prop_assert_eq!(before, capacity);
                        let evicted_fitness = evicted.fitness;
                        prop_assert!(evicted_fitness.is_some());
                        prop_assert_eq!(evicted_fitness, worst_before);
                        prop_assert!(f > evicted_fitness);
                        prop_assert!(pop.get_candidate(&evicted.id).is_err());
                        prop_assert!(pop.get_candidate(&incoming_id).is_ok());
                    }
                    Ok(None) => {
                        prop_assert_eq!(pop.len(), before + 1);
                        prop_assert!(pop.get_candidate(&incoming_id).is_ok());
                    }
                    Err(_) => {
                        prop_assert_eq!(pop.len(), before);
                        prop_assert!(pop.get_candidate(&incoming_id).is_err());
                    }
                }
                prop_assert!(pop.len() <= pop.capacity());
                prop_assert_eq!(pop.statistics().size, pop.len());
            }
        }
    }
}
