//! Generation loop for prompt optimization.
//!
//! [`Optimizer`] ties the other components together. Each generation:
//!
//! 1. Submits every unevaluated candidate to the [`Scheduler`](crate::scheduler::Scheduler),
//!    capped by the remaining evaluation budget, and waits for all results
//! 2. Records fitness and objective scores; failed evaluations leave the
//!    candidate unevaluated
//! 3. Charges the budget, measures diversity and asks the
//!    [`MutationScheduler`](crate::mutation::MutationScheduler) for a rate
//! 4. Checks stop conditions: generation limit, budget, convergence
//! 5. Keeps the elites and fills the rest with crossover and mutation
//!    offspring of selected parents
//!
//! Candidates are ranked by fitness, or by Pareto rank and crowding
//! distance when [`OptimizerConfig::objectives`] is non-empty.
//!
//! # Key Types
//!
//! - [`OptimizerConfig`]: parameters and presets (`fast`, `balanced`, `thorough`)
//! - [`Optimizer`]: runs the loop; safe to query from other tasks while running
//! - [`OptimizationResult`]: best prompts, per-generation history, stop reason
//!
//! # References
//!
//! - Agrawal et al. (2025), *GEPA: Reflective Prompt Evolution Can Outperform
//!   Reinforcement Learning*
//! - Deb et al. (2002), *A Fast and Elitist Multiobjective GA: NSGA-II*

mod config;
mod runner;
mod seeding;
mod selection;
mod types;

pub use config::OptimizerConfig;
pub use runner::Optimizer;
pub use seeding::{DEFAULT_PROMPT, INSTRUCTION_SUFFIXES};
pub use selection::Selection;
pub use types::{
    BestPrompt, GenerationMetrics, OptimizationResult, OptimizerState, OptimizerStatus,
    StopReason, DEFAULT_BEST_PROMPTS,
};
