// crates/evoseal-adapters/src/lib.rs
// ============================================================================
// Crate: evoseal-adapters
// Description: The component adapter framework — uniform lifecycle and
//              operation-dispatch contracts for evolution engines, program
//              optimizers, and self-adapting language models.
// ============================================================================

//! Wraps every external engine kind the orchestrator drives behind one
//! polymorphic [`adapter::ComponentAdapter`] contract, so the orchestrator
//! never needs engine-specific branching.

pub mod adapter;
pub mod error;
pub mod evolution_engine;
pub mod program_optimizer;
pub mod rate_limit;
pub mod remote;
pub mod self_adapting_lm;
pub mod state;

pub use adapter::AdapterStatus;
pub use adapter::ComponentAdapter;
pub use error::AdapterError;
pub use evolution_engine::EvolutionEngine;
pub use evolution_engine::EvolutionEngineAdapter;
pub use program_optimizer::OptimizerMode;
pub use program_optimizer::PackageOptimizer;
pub use program_optimizer::ProgramOptimizerAdapter;
pub use rate_limit::RateLimiter;
pub use remote::JobStatus;
pub use remote::RemoteClientConfig;
pub use remote::RemoteJobClient;
pub use self_adapting_lm::SelfAdaptingLMAdapter;
pub use state::AdapterState;
pub use state::StateCell;
