//! The generation loop.
//!
//! [`Optimizer`] composes the population, scheduler, budget ledger,
//! mutation scheduler and Pareto ranking:
//! evaluate → fold results → diversity & rate → select → reproduce → repeat.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::config::OptimizerConfig;
use super::seeding;
use super::types::{
    BestPrompt, GenerationMetrics, OptimizationResult, OptimizerState, OptimizerStatus,
    StopReason, DEFAULT_BEST_PROMPTS,
};
use crate::budget::{BudgetManager, Consumption};
use crate::collaborators::{
    Crossover, DiversityMetrics, DiversitySnapshot, Evaluator, Reflector, SentenceCrossover,
    TaskDescriptor, TextDiversity, Trajectory,
};
use crate::error::OptimizerError;
use crate::mutation::MutationScheduler;
use crate::pareto::DominanceComparator;
use crate::population::{Candidate, CandidateId, CandidateMetadata, Origin, Population};
use crate::scheduler::{Scheduler, TaskId, TaskOutcome, TaskSpec};

/// Long-lived prompt optimizer.
///
/// Created by [`start`](Self::start), which validates the configuration and
/// seeds the population. [`optimize`](Self::optimize) then runs generations
/// until a stop condition fires. [`status`](Self::status) and
/// [`get_best_prompts`](Self::get_best_prompts) may be called from other
/// tasks at any time; they only take a short read lock.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use u_gepa::collaborators::{Evaluation, Evaluator, TaskDescriptor};
/// use u_gepa::error::EvaluationError;
/// use u_gepa::optimizer::{Optimizer, OptimizerConfig};
///
/// struct LengthScore;
///
/// #[async_trait]
/// impl Evaluator for LengthScore {
///     async fn evaluate(
///         &self,
///         prompt: &str,
///         _task: &TaskDescriptor,
///         _timeout: Duration,
///     ) -> Result<Evaluation, EvaluationError> {
///         Ok(Evaluation::with_fitness((prompt.len() as f64 / 200.0).min(1.0)))
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = OptimizerConfig::fast()
///     .with_task(serde_json::json!({"name": "demo"}))
///     .with_seed_prompts(["Answer the question."])
///     .with_seed(7);
/// let optimizer = Optimizer::start(config, Arc::new(LengthScore)).unwrap();
/// let result = optimizer.optimize().await.unwrap();
/// assert!(result.final_generation >= 1);
/// assert!(!result.best_prompts.is_empty());
/// # });
/// ```
pub struct Optimizer {
    config: OptimizerConfig,
    task: TaskDescriptor,
    evaluator: Arc<dyn Evaluator>,
    reflector: Option<Arc<dyn Reflector>>,
    crossover: Arc<dyn Crossover>,
    diversity: Arc<dyn DiversityMetrics>,
    comparator: Option<DominanceComparator>,
    inner: RwLock<Inner>,
    running: AtomicBool,
    cancel: AtomicBool,
    started_at: Instant,
}

struct Inner {
    state: OptimizerState,
    population: Population,
    budget: BudgetManager,
    mutation: MutationScheduler,
    history: Vec<GenerationMetrics>,
    /// Trajectory of each candidate's latest successful evaluation.
    trajectories: HashMap<CandidateId, Trajectory>,
}

/// Cleanup for one `optimize` call.
///
/// Unless [`settle`](Self::settle) ran, dropping the guard aborts in-flight
/// evaluations, charges them to the budget and moves a running optimizer
/// to `Failed`. This covers both early errors and a dropped future. The
/// running flag is always released.
struct RunGuard<'a> {
    optimizer: &'a Optimizer,
    scheduler: Option<Scheduler>,
    evaluations_at_start: u64,
    settled: bool,
}

impl<'a> RunGuard<'a> {
    fn new(optimizer: &'a Optimizer) -> Self {
        Self {
            optimizer,
            scheduler: None,
            evaluations_at_start: 0,
            settled: false,
        }
    }

    /// Charges evaluator calls that ran (or were aborted mid-call) but
    /// whose results the loop never recorded.
    fn charge_untracked(&self) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        let status = scheduler.status();
        let started = status.total_completed + status.total_failed + status.total_aborted;
        let mut inner = self.optimizer.inner.write();
        let recorded = inner
            .budget
            .evaluations_used()
            .saturating_sub(self.evaluations_at_start);
        let untracked = started.saturating_sub(recorded);
        if untracked > 0 {
            inner.budget.charge(Consumption::evaluations(untracked));
            debug!(untracked, "charged unrecorded evaluations");
        }
    }

    /// Marks the call as finished normally, after the scheduler drained.
    fn settle(&mut self) {
        self.charge_untracked();
        self.settled = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            if let Some(scheduler) = &self.scheduler {
                scheduler.abort();
            }
            self.charge_untracked();
            let mut inner = self.optimizer.inner.write();
            if inner.state == OptimizerState::Running {
                inner.state = OptimizerState::Failed;
                warn!(
                    generation = inner.population.generation(),
                    "optimization interrupted before completion"
                );
            }
        }
        self.optimizer.running.store(false, Ordering::Release);
    }
}

/// Results of one evaluation barrier.
struct GenerationOutcome {
    attempted: HashSet<CandidateId>,
    evaluations: u64,
    failed: u64,
    cost: f64,
}

/// A child awaiting insertion into the next generation.
struct Offspring {
    prompt: String,
    origin: Origin,
    parents: Vec<CandidateId>,
}

impl Optimizer {
    /// Validates `config`, seeds the population and returns a ready
    /// optimizer.
    ///
    /// # Errors
    ///
    /// - [`OptimizerError::TaskConfigRequired`] when `config.task` is `None`
    /// - [`OptimizerError::InvalidConfig`] when validation fails
    pub fn start(
        config: OptimizerConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self, OptimizerError> {
        let task = config.task.clone().ok_or(OptimizerError::TaskConfigRequired)?;
        config.validate().map_err(OptimizerError::InvalidConfig)?;

        let comparator = (!config.objectives.is_empty())
            .then(|| DominanceComparator::new(config.objectives.iter().map(|o| o.name.clone())));

        let optimizer = Self {
            inner: RwLock::new(Inner {
                state: OptimizerState::Initializing,
                population: Population::new(config.population_size)?,
                budget: BudgetManager::new(config.effective_budget())
                    .map_err(OptimizerError::InvalidConfig)?,
                mutation: MutationScheduler::new(config.mutation.clone())
                    .map_err(OptimizerError::InvalidConfig)?,
                history: Vec::new(),
                trajectories: HashMap::new(),
            }),
            task,
            evaluator,
            reflector: None,
            crossover: Arc::new(SentenceCrossover),
            diversity: Arc::new(TextDiversity::default()),
            comparator,
            running: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            started_at: Instant::now(),
            config,
        };

        {
            let mut inner = optimizer.inner.write();
            let generation = inner.population.generation();
            seed_population(&mut inner.population, &optimizer.config.seed_prompts, generation)?;
            inner.state = OptimizerState::Ready;
            info!(
                population = inner.population.len(),
                max_generations = optimizer.config.max_generations,
                objectives = optimizer.config.objectives.len(),
                "optimizer ready"
            );
        }
        Ok(optimizer)
    }

    /// Uses `reflector` to propose mutation edits.
    ///
    /// Without a reflector, mutation appends a built-in instruction suffix.
    pub fn with_reflector(mut self, reflector: Arc<dyn Reflector>) -> Self {
        self.reflector = Some(reflector);
        self
    }

    /// Replaces the default [`SentenceCrossover`].
    pub fn with_crossover(mut self, crossover: Arc<dyn Crossover>) -> Self {
        self.crossover = crossover;
        self
    }

    /// Replaces the default [`TextDiversity`].
    pub fn with_diversity(mut self, diversity: Arc<dyn DiversityMetrics>) -> Self {
        self.diversity = diversity;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn state(&self) -> OptimizerState {
        self.inner.read().state
    }

    pub fn status(&self) -> OptimizerStatus {
        let inner = self.inner.read();
        OptimizerStatus {
            state: inner.state,
            generation: inner.population.generation(),
            population_size: inner.population.len(),
            evaluations_used: inner.budget.evaluations_used(),
            evaluations_remaining: inner.budget.remaining_evaluations(),
            best_fitness: inner.population.statistics().best_fitness,
            uptime_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }

    /// Evaluated prompts, best first.
    pub fn get_best_prompts(&self, limit: usize) -> Vec<BestPrompt> {
        let inner = self.inner.read();
        inner
            .population
            .get_best(limit, None)
            .into_iter()
            .filter_map(BestPrompt::from_candidate)
            .collect()
    }

    /// Per-generation metrics recorded so far.
    pub fn history(&self) -> Vec<GenerationMetrics> {
        self.inner.read().history.clone()
    }

    /// Writes a snapshot of the current population.
    pub fn save_population(&self, path: impl AsRef<Path>) -> Result<(), OptimizerError> {
        self.inner.read().population.save(path)?;
        Ok(())
    }

    /// Asks a running `optimize` to finish at the next generation boundary.
    pub fn stop(&self) {
        info!("optimizer stop requested");
        self.cancel.store(true, Ordering::Release);
    }

    /// Runs the generation loop to completion.
    ///
    /// Dropping the returned future before it resolves aborts in-flight
    /// evaluations, charges them to the budget and leaves the optimizer
    /// `Failed`.
    ///
    /// # Errors
    ///
    /// - [`OptimizerError::AlreadyRunning`] if another call is in progress
    /// - [`OptimizerError::NotReady`] if the optimizer already finished
    pub async fn optimize(&self) -> Result<OptimizationResult, OptimizerError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OptimizerError::AlreadyRunning);
        }
        let mut guard = RunGuard::new(self);

        {
            let mut inner = self.inner.write();
            if inner.state != OptimizerState::Ready {
                return Err(OptimizerError::NotReady(inner.state.to_string()));
            }
            inner.state = OptimizerState::Running;
            guard.evaluations_at_start = inner.budget.evaluations_used();
        }

        let started = Instant::now();
        let scheduler = Scheduler::start(self.config.scheduler_config())?;
        guard.scheduler = Some(scheduler.clone());

        let outcome = self.run_generations(&scheduler).await;
        scheduler.stop().await;
        guard.settle();

        match outcome {
            Ok(stop_reason) => {
                let mut inner = self.inner.write();
                inner.state = OptimizerState::Completed;
                let result = OptimizationResult {
                    best_prompts: inner
                        .population
                        .get_best(DEFAULT_BEST_PROMPTS, None)
                        .into_iter()
                        .filter_map(BestPrompt::from_candidate)
                        .collect(),
                    final_generation: inner.population.generation(),
                    total_evaluations: inner.budget.evaluations_used(),
                    history: inner.history.clone(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    stop_reason,
                };
                info!(
                    %stop_reason,
                    generations = result.final_generation,
                    evaluations = result.total_evaluations,
                    best_fitness = result.best().map(|b| b.fitness),
                    duration_ms = result.duration_ms,
                    "optimization finished"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "optimization failed");
                self.inner.write().state = OptimizerState::Failed;
                Err(err)
            }
        }
    }

    async fn run_generations(&self, scheduler: &Scheduler) -> Result<StopReason, OptimizerError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };

        let reason = loop {
            if self.cancel.load(Ordering::Acquire) {
                break StopReason::Stopped;
            }
            if self.inner.read().budget.budget_exhausted() {
                break StopReason::BudgetExhausted;
            }

            let outcome = self.evaluate_generation(scheduler).await?;
            let tail = Instant::now();
            let (rate, metrics) = self.fold_generation(&outcome);

            if let Some(reason) = self.stop_condition() {
                break reason;
            }
            if self.cancel.load(Ordering::Acquire) {
                break StopReason::Stopped;
            }

            debug!(
                generation = metrics.generation,
                rate, "reproducing next generation"
            );
            self.reproduce(&outcome.attempted, rate, &mut rng).await?;
            self.inner
                .write()
                .budget
                .charge(Consumption::default().with_time(tail.elapsed()));
        };

        Ok(reason)
    }

    /// Submits every unevaluated candidate (up to the budget cap) and waits
    /// for all results.
    async fn evaluate_generation(
        &self,
        scheduler: &Scheduler,
    ) -> Result<GenerationOutcome, OptimizerError> {
        let started = Instant::now();
        let batch: Vec<(CandidateId, String)> = {
            let inner = self.inner.read();
            let cap = [
                inner.budget.available_budget().limited(),
                inner.budget.remaining_evaluations().limited(),
            ]
            .into_iter()
            .flatten()
            .min()
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

            inner
                .population
                .unevaluated_ids()
                .into_iter()
                .take(cap)
                .filter_map(|id| {
                    let prompt = inner.population.get_candidate(&id).ok()?.prompt.clone();
                    Some((id, prompt))
                })
                .collect()
        };

        let mut submitted: Vec<(CandidateId, TaskId)> = Vec::with_capacity(batch.len());
        for (id, prompt) in batch {
            let spec = TaskSpec::new(id.clone(), prompt, Arc::clone(&self.evaluator))
                .with_task(self.task.clone());
            let task_id = scheduler.submit_task(spec)?;
            submitted.push((id, task_id));
        }

        let mut outcome = GenerationOutcome {
            attempted: HashSet::with_capacity(submitted.len()),
            evaluations: 0,
            failed: 0,
            cost: 0.0,
        };
        let mut results = Vec::with_capacity(submitted.len());
        for (id, task_id) in submitted {
            let result = scheduler.wait_for(task_id).await?;
            outcome.attempted.insert(id);
            results.push(result);
        }
        scheduler.prune();

        let mut inner = self.inner.write();
        for result in results {
            outcome.evaluations += 1;
            match result.outcome {
                TaskOutcome::Completed(evaluation) => {
                    outcome.cost += evaluation.cost.max(0.0);
                    let mut objectives: BTreeMap<String, f64> = evaluation.metrics;
                    objectives.insert("fitness".to_string(), evaluation.fitness);
                    inner.population.record_evaluation(
                        &result.candidate_id,
                        evaluation.fitness,
                        objectives,
                    )?;
                    inner
                        .trajectories
                        .insert(result.candidate_id, evaluation.trajectory);
                }
                TaskOutcome::Failed(err) => {
                    outcome.failed += 1;
                    debug!(candidate = %result.candidate_id, error = %err, "evaluation failed");
                }
            }
        }
        if !self.config.objectives.is_empty() {
            inner.population.normalize_objectives(&self.config.objectives);
        }

        let generation = inner.population.generation() + 1;
        inner.budget.record_consumption(
            Consumption::evaluations(outcome.evaluations)
                .with_cost(outcome.cost)
                .with_time(started.elapsed())
                .for_generation(generation),
        );
        Ok(outcome)
    }

    /// Computes diversity and the next mutation rate, records metrics and
    /// advances the generation counter.
    fn fold_generation(&self, outcome: &GenerationOutcome) -> (f64, GenerationMetrics) {
        let mut inner = self.inner.write();
        let snapshot: DiversitySnapshot = {
            let all = inner.population.get_all();
            let prompts: Vec<&str> = all.iter().map(|c| c.prompt.as_str()).collect();
            self.diversity.calculate(&prompts)
        };

        let stats = inner.population.statistics().clone();
        let current = inner.population.generation();
        let max_generations = self.config.max_generations;
        let rate = inner
            .mutation
            .next_rate(current, max_generations, stats.best_fitness, Some(&snapshot));

        let generation = inner.population.next_generation();
        let metrics = GenerationMetrics {
            generation,
            best_fitness: stats.best_fitness,
            average_fitness: stats.average_fitness,
            diversity: stats.diversity,
            diversity_level: snapshot.level,
            pairwise_diversity: snapshot.pairwise_diversity,
            mutation_rate: rate,
            evaluations: outcome.evaluations,
            failed_evaluations: outcome.failed,
            total_evaluations: inner.budget.evaluations_used(),
            timestamp: chrono::Utc::now(),
        };
        info!(
            generation,
            best_fitness = ?metrics.best_fitness,
            average_fitness = ?metrics.average_fitness,
            diversity = metrics.pairwise_diversity,
            mutation_rate = rate,
            evaluations = metrics.evaluations,
            failed = metrics.failed_evaluations,
            "generation complete"
        );
        inner.history.push(metrics.clone());
        (rate, metrics)
    }

    /// Stop conditions in priority order.
    fn stop_condition(&self) -> Option<StopReason> {
        let inner = self.inner.read();
        if inner.population.generation() >= self.config.max_generations {
            return Some(StopReason::MaxGenerationsReached);
        }
        if inner.budget.budget_exhausted() {
            return Some(StopReason::BudgetExhausted);
        }
        let window = self.config.convergence_window;
        if inner.history.len() >= window {
            let recent: Option<Vec<f64>> = inner.history[inner.history.len() - window..]
                .iter()
                .map(|m| m.best_fitness)
                .collect();
            if let Some(values) = recent {
                if variance(&values) < self.config.convergence_epsilon {
                    return Some(StopReason::Converged);
                }
            }
        }
        None
    }

    /// Replaces the non-elite part of the population with offspring.
    ///
    /// Candidates that were not attempted this generation (deferred by the
    /// budget cap) are kept for the next one.
    async fn reproduce(
        &self,
        attempted: &HashSet<CandidateId>,
        rate: f64,
        rng: &mut StdRng,
    ) -> Result<(), OptimizerError> {
        let (survivors, deferred, mut seen) = {
            let inner = self.inner.read();
            let all = inner.population.get_all();
            let seen: HashSet<String> = all.iter().map(|c| c.prompt.clone()).collect();
            let evaluated: Vec<Candidate> =
                all.iter().filter(|c| c.is_evaluated()).map(|&c| c.clone()).collect();
            let deferred: Vec<CandidateId> = all
                .iter()
                .filter(|c| !c.is_evaluated() && !attempted.contains(&c.id))
                .map(|c| c.id.clone())
                .collect();
            (self.rank(evaluated), deferred, seen)
        };

        if survivors.is_empty() {
            if deferred.is_empty() {
                warn!("no candidate survived evaluation, reseeding population");
                let mut inner = self.inner.write();
                let generation = inner.population.generation();
                let ids: Vec<CandidateId> = inner
                    .population
                    .get_all()
                    .iter()
                    .map(|c| c.id.clone())
                    .collect();
                for id in &ids {
                    inner.population.remove_candidate(id)?;
                }
                inner.trajectories.clear();
                seed_population(&mut inner.population, &self.config.seed_prompts, generation)?;
            }
            return Ok(());
        }

        let elite_count = self.config.elite_count.min(survivors.len());
        let target = self
            .config
            .population_size
            .saturating_sub(elite_count + deferred.len());

        // Single objective: fitness. Pareto: position in rank order.
        let scores: Vec<f64> = if self.comparator.is_some() {
            let n = survivors.len();
            (0..n).map(|i| (n - i) as f64).collect()
        } else {
            survivors.iter().map(|c| c.fitness.unwrap_or(0.0)).collect()
        };

        let mut offspring: Vec<Offspring> = Vec::with_capacity(target);
        let max_attempts = target.saturating_mul(4).max(8);
        let mut attempts = 0;

        while offspring.len() < target && attempts < max_attempts {
            attempts += 1;
            let (Some(i), Some(j)) = (
                self.config.selection.select(&scores, rng),
                self.config.selection.select(&scores, rng),
            ) else {
                break;
            };
            let a = &survivors[i];
            let b = &survivors[j];

            let crossed = i != j && rng.random_range(0.0..1.0) < self.config.crossover_rate;
            let children = if crossed {
                match self.crossover.combine(&a.prompt, &b.prompt).await {
                    Ok(children) if !children.is_empty() => children,
                    Ok(_) => vec![a.prompt.clone()],
                    Err(err) => {
                        warn!(error = %err, "crossover failed, cloning parent");
                        vec![a.prompt.clone()]
                    }
                }
            } else {
                vec![a.prompt.clone()]
            };

            for child in children {
                if offspring.len() >= target {
                    break;
                }
                let mutate = rng.random_range(0.0..1.0) < rate;
                let mut text = child;
                let mut mutated = false;
                if mutate || seen.contains(&text) {
                    text = self.mutate(&text, &a.id, rng).await;
                    mutated = true;
                }
                if !seen.insert(text.clone()) {
                    continue;
                }

                let (origin, parents) = if crossed {
                    (Origin::Crossover, vec![a.id.clone(), b.id.clone()])
                } else if mutated {
                    (Origin::Mutation, vec![a.id.clone()])
                } else {
                    (Origin::Variant, vec![a.id.clone()])
                };
                offspring.push(Offspring {
                    prompt: text,
                    origin,
                    parents,
                });
            }
        }

        let mut inner = self.inner.write();
        let keep: HashSet<CandidateId> = survivors[..elite_count]
            .iter()
            .map(|c| c.id.clone())
            .chain(deferred)
            .collect();
        let stale: Vec<CandidateId> = inner
            .population
            .get_all()
            .iter()
            .filter(|c| !keep.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();
        for id in &stale {
            inner.population.remove_candidate(id)?;
            inner.trajectories.remove(id);
        }

        let generation = inner.population.generation();
        let produced = offspring.len();
        for child in offspring {
            let candidate = Candidate::new(child.prompt)
                .with_generation(generation)
                .with_metadata(CandidateMetadata {
                    origin: child.origin,
                    parents: child.parents,
                    mutation_rate: Some(rate),
                    notes: BTreeMap::new(),
                });
            inner.population.add_candidate(candidate)?;
        }
        debug!(
            generation,
            elites = elite_count,
            offspring = produced,
            target,
            "next generation assembled"
        );
        Ok(())
    }

    /// Best-first ordering of evaluated candidates.
    fn rank(&self, evaluated: Vec<Candidate>) -> Vec<Candidate> {
        match &self.comparator {
            Some(comparator) => comparator.rank_order(&evaluated),
            None => {
                let mut ranked = evaluated;
                ranked.sort_by(|a, b| {
                    b.fitness
                        .partial_cmp(&a.fitness)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                ranked
            }
        }
    }

    /// Applies reflection edits to `prompt`, falling back to a built-in
    /// perturbation when no reflector is set, the reflector fails, or the
    /// edits change nothing.
    async fn mutate(&self, prompt: &str, parent: &CandidateId, rng: &mut StdRng) -> String {
        if let Some(reflector) = &self.reflector {
            let trajectory = self
                .inner
                .read()
                .trajectories
                .get(parent)
                .cloned()
                .unwrap_or_default();
            match reflector.generate_edits(prompt, &trajectory).await {
                Ok(plan) => {
                    let edited = plan.apply(prompt);
                    if edited != prompt {
                        return edited;
                    }
                }
                Err(err) => warn!(error = %err, "reflection failed, using fallback mutation"),
            }
        }
        seeding::perturb(prompt, rng)
    }
}

fn seed_population(
    population: &mut Population,
    seeds: &[String],
    generation: u64,
) -> Result<(), OptimizerError> {
    let plan = seeding::plan(seeds, population.capacity());
    let mut seed_ids = Vec::with_capacity(plan.seeds.len());
    for prompt in plan.seeds {
        let candidate = Candidate::new(prompt).with_generation(generation);
        seed_ids.push(candidate.id.clone());
        population.add_candidate(candidate)?;
    }
    for (prompt, parent) in plan.variants {
        let parents = seed_ids.get(parent).cloned().into_iter().collect();
        let candidate = Candidate::new(prompt)
            .with_generation(generation)
            .with_origin(Origin::Variant, parents);
        population.add_candidate(candidate)?;
    }
    Ok(())
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

// ============================================================================
// Tests
// ============================================================================
