// crates/evoseal-config/src/lib.rs
// ============================================================================
// Crate: evoseal-config
// Description: TOML + environment configuration loading and validation.
// Purpose: The single source of truth every other crate reads settings from;
//          ambient infrastructure, not an evolution feature itself.
// ============================================================================

//! # evoseal-config
//!
//! Loads [`AppConfig`] from TOML, applies `EVOSEAL_<SECTION>_<KEY>`
//! environment overrides for scalar fields, and validates the result before
//! any other component sees it. Unknown keys are rejected rather than
//! silently ignored.

pub mod config;
pub mod error;
pub mod threshold;

pub use config::AppConfig;
pub use config::CheckpointConfig;
pub use config::DashboardConfig;
pub use config::EvolutionConfig;
pub use config::RollbackPolicyConfig;
pub use config::SafetyConfig;
pub use config::StoreConfig;
pub use error::ConfigError;
pub use threshold::ThresholdDirection;
pub use threshold::ThresholdPair;
