//! Genetic/Pareto prompt optimization engine.
//!
//! Evolves a population of prompt texts against a caller-supplied
//! evaluator:
//!
//! - **Population**: fixed-capacity candidate store with replacement,
//!   cached statistics, and versioned binary snapshots.
//! - **Scheduler**: bounded-concurrency evaluation queue with priorities,
//!   per-task timeouts, and panic containment.
//! - **Budget**: evaluation, cost, generation, and time accounting with
//!   optional per-generation allocations.
//! - **Mutation**: constant, decaying, adaptive, or manual mutation rates.
//! - **Pareto**: NSGA-II non-dominated sorting and crowding distance.
//! - **Optimizer**: the generation loop composing all of the above.
//!
//! # Architecture
//!
//! The engine owns no model access. Evaluation, reflection, crossover and
//! diversity measurement are injected through the traits in
//! [`collaborators`], so LLM clients and scoring live with the consumer.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use u_gepa::collaborators::{Evaluation, Evaluator, TaskDescriptor, Trajectory};
//! use u_gepa::error::EvaluationError;
//! use u_gepa::{Optimizer, OptimizerConfig};
//!
//! struct Judge;
//!
//! #[async_trait]
//! impl Evaluator for Judge {
//!     async fn evaluate(
//!         &self,
//!         prompt: &str,
//!         _task: &TaskDescriptor,
//!         _timeout: Duration,
//!     ) -> Result<Evaluation, EvaluationError> {
//!         // call a model, compare against references...
//!         let fitness = if prompt.contains("step") { 0.8 } else { 0.4 };
//!         let trajectory = Trajectory {
//!             steps: vec![format!("judged {} chars", prompt.len())],
//!             feedback: "answers lack intermediate reasoning".into(),
//!         };
//!         Ok(Evaluation::with_fitness(fitness).with_trajectory(trajectory))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), u_gepa::error::OptimizerError> {
//!     let config = OptimizerConfig::balanced()
//!         .with_task(serde_json::json!({"dataset": "qa-dev"}))
//!         .with_seed_prompts(["Answer the question."]);
//!     let optimizer = Optimizer::start(config, Arc::new(Judge))?;
//!     let result = optimizer.optimize().await?;
//!     if let Some(best) = result.best() {
//!         println!("{:.3} {}", best.fitness, best.prompt);
//!     }
//!     Ok(())
//! }
//! ```

pub mod budget;
pub mod collaborators;
pub mod error;
pub mod mutation;
pub mod optimizer;
pub mod pareto;
pub mod population;
pub mod scheduler;

pub use optimizer::{OptimizationResult, Optimizer, OptimizerConfig, StopReason};
