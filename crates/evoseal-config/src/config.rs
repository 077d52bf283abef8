// crates/evoseal-config/src/config.rs
// ============================================================================
// Module: EVOSEAL Configuration
// Description: Top-level configuration struct, loading, and validation.
// Purpose: The single source of truth every other crate reads settings from.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! [`AppConfig::load`] resolves a TOML file (explicit path, else
//! `EVOSEAL_CONFIG`, else `evoseal.toml` in the working directory), parses
//! it with `#[serde(deny_unknown_fields)]` at every level so a typo'd key is
//! a load-time error rather than a silently ignored field, applies
//! `EVOSEAL_<SECTION>_<KEY>` environment overrides for scalar fields, and
//! validates the result before returning it. Every section composes its own
//! `validate()` so [`AppConfig::validate`] reads as a flat checklist.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::threshold::ThresholdPair;

/// Environment variable naming the configuration file path.
const CONFIG_ENV_VAR: &str = "EVOSEAL_CONFIG";

/// Configuration file name used when neither an explicit path nor
/// [`CONFIG_ENV_VAR`] is set.
const DEFAULT_CONFIG_NAME: &str = "evoseal.toml";

/// Largest configuration file `load` will read.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Largest path string `load` will accept, in bytes.
const MAX_PATH_LENGTH: usize = 4096;

/// Default dashboard metrics streaming interval, in seconds.
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 30;

/// Default dashboard bind host: loopback only, never a public interface.
const DEFAULT_DASHBOARD_HOST: &str = "127.0.0.1";

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// The complete EVOSEAL process configuration.
///
/// # Invariants
/// - Every nested section is independently valid after [`Self::validate`]
///   returns `Ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    /// Continuous Evolution Service timing and gating.
    pub evolution: EvolutionConfig,
    /// Checkpoint retention and storage.
    pub checkpoint: CheckpointConfig,
    /// Regression detection and rollback policy.
    pub safety: SafetyConfig,
    /// Dashboard server bind address and streaming cadence.
    pub dashboard: DashboardConfig,
    /// Persistent storage backend.
    pub store: StoreConfig,
}

impl AppConfig {
    /// Loads configuration from `path`, or from [`CONFIG_ENV_VAR`] /
    /// [`DEFAULT_CONFIG_NAME`] when `path` is `None`, applies environment
    /// overrides, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, is not valid
    /// TOML, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let metadata = fs::metadata(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let content = std::str::from_utf8(&bytes)
            .map_err(|_err| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `EVOSEAL_<SECTION>_<KEY>` environment overrides for scalar
    /// fields. Map-valued fields (`metric_thresholds`, `resource_thresholds`)
    /// are TOML-only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override's value fails to
    /// parse as the field's type.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_override("EVOSEAL_EVOLUTION_EVOLUTION_INTERVAL_SECS")? {
            self.evolution.evolution_interval_secs = v;
        }
        if let Some(v) = env_override("EVOSEAL_EVOLUTION_TRAINING_INTERVAL_SECS")? {
            self.evolution.training_interval_secs = v;
        }
        if let Some(v) = env_override("EVOSEAL_EVOLUTION_MIN_SAMPLES_FOR_TRAINING")? {
            self.evolution.min_samples_for_training = v;
        }
        if let Some(v) = env_override("EVOSEAL_EVOLUTION_MIN_SUCCESSFUL_RATIO")? {
            self.evolution.min_successful_ratio = v;
        }
        if let Some(v) = env_override("EVOSEAL_EVOLUTION_MIN_QUALITY_FOR_DEPLOY")? {
            self.evolution.min_quality_for_deploy = v;
        }
        if let Some(v) = env_override::<String>("EVOSEAL_EVOLUTION_MODEL_ENDPOINT")? {
            self.evolution.model_endpoint = v;
        }
        if let Some(v) = env_override::<PathBuf>("EVOSEAL_CHECKPOINT_CHECKPOINT_DIR")? {
            self.checkpoint.checkpoint_dir = v;
        }
        if let Some(v) = env_override("EVOSEAL_CHECKPOINT_MAX_CHECKPOINTS")? {
            self.checkpoint.max_checkpoints = v;
        }
        if let Some(v) = env_override("EVOSEAL_CHECKPOINT_AUTO_CHECKPOINT")? {
            self.checkpoint.auto_checkpoint = v;
        }
        if let Some(v) = env_override("EVOSEAL_SAFETY_AUTO_ROLLBACK")? {
            self.safety.auto_rollback = v;
        }
        if let Some(v) = env_override("EVOSEAL_SAFETY_REGRESSION_THRESHOLD")? {
            self.safety.regression_threshold = v;
        }
        if let Some(v) = env_override::<String>("EVOSEAL_DASHBOARD_HOST")? {
            self.dashboard.host = v;
        }
        if let Some(v) = env_override("EVOSEAL_DASHBOARD_PORT")? {
            self.dashboard.port = v;
        }
        if let Some(v) = env_override("EVOSEAL_DASHBOARD_UPDATE_INTERVAL_SECS")? {
            self.dashboard.update_interval_secs = v;
        }
        if let Some(v) = env_override::<PathBuf>("EVOSEAL_STORE_SQLITE_PATH")? {
            self.store.sqlite_path = v;
        }
        Ok(())
    }

    /// Validates every nested section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first section that fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()?;
        self.checkpoint.validate()?;
        self.safety.validate()?;
        self.dashboard.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Evolution Service Config
// ============================================================================

/// Timing and gating for the Continuous Evolution Service (C9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EvolutionConfig {
    /// Period of the evolution monitor loop, in seconds.
    pub evolution_interval_secs: u64,
    /// Period of the training monitor loop, in seconds.
    pub training_interval_secs: u64,
    /// Minimum samples the data collector must hold before a training cycle
    /// is eligible.
    pub min_samples_for_training: u64,
    /// Minimum fraction of successful samples required, in `[0, 1]`.
    pub min_successful_ratio: f64,
    /// Minimum aggregate quality score required to deploy a candidate model
    /// version, in `[0, 1]`.
    pub min_quality_for_deploy: f64,
    /// Base URL of the external model training/evaluation endpoint.
    pub model_endpoint: String,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            evolution_interval_secs: 300,
            training_interval_secs: 3600,
            min_samples_for_training: 50,
            min_successful_ratio: 0.8,
            min_quality_for_deploy: 0.7,
            model_endpoint: "http://127.0.0.1:8000".to_string(),
        }
    }
}

impl EvolutionConfig {
    /// Validates interval, ratio, and endpoint fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an interval is zero, a ratio is
    /// out of `[0, 1]`, or the endpoint is not a well-formed `http(s)` URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evolution_interval_secs == 0 {
            return Err(ConfigError::Invalid("evolution.evolution_interval_secs must be > 0".to_string()));
        }
        if self.training_interval_secs == 0 {
            return Err(ConfigError::Invalid("evolution.training_interval_secs must be > 0".to_string()));
        }
        validate_unit_ratio("evolution.min_successful_ratio", self.min_successful_ratio)?;
        validate_unit_ratio("evolution.min_quality_for_deploy", self.min_quality_for_deploy)?;
        if !self.model_endpoint.starts_with("http://") && !self.model_endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "evolution.model_endpoint must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Checkpoint Config
// ============================================================================

/// Checkpoint retention and storage (C3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CheckpointConfig {
    /// Base directory for checkpoint payloads, laid out as
    /// `<checkpoint_dir>/<version_id>/`.
    pub checkpoint_dir: PathBuf,
    /// Maximum number of checkpoints retained before the oldest
    /// non-manual checkpoint is pruned.
    pub max_checkpoints: usize,
    /// Whether a checkpoint is taken automatically before each iteration.
    pub auto_checkpoint: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./data/checkpoints"),
            max_checkpoints: 20,
            auto_checkpoint: true,
        }
    }
}

impl CheckpointConfig {
    /// Validates the checkpoint directory path and retention count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the path is empty/oversized or
    /// `max_checkpoints` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_field("checkpoint.checkpoint_dir", &self.checkpoint_dir)?;
        if self.max_checkpoints == 0 {
            return Err(ConfigError::Invalid("checkpoint.max_checkpoints must be > 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Safety Config
// ============================================================================

/// Regression detection and rollback policy (C4, C5, C6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SafetyConfig {
    /// Enables automatic rollback on critical regression or test failure.
    pub auto_rollback: bool,
    /// Default relative regression threshold applied to metrics without a
    /// dedicated entry in `metric_thresholds`.
    pub regression_threshold: f64,
    /// Per-metric `{warn, critical}` threshold overrides, keyed by metric
    /// name.
    pub metric_thresholds: BTreeMap<String, ThresholdPair>,
    /// Per-resource-dimension `{warn, critical}` thresholds, keyed by
    /// dimension (`cpu`, `memory`, `disk`, `net`).
    pub resource_thresholds: BTreeMap<String, ThresholdPair>,
    /// Rollback manager policy.
    pub rollback_policy: RollbackPolicyConfig,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            auto_rollback: true,
            regression_threshold: 0.1,
            metric_thresholds: BTreeMap::new(),
            resource_thresholds: BTreeMap::new(),
            rollback_policy: RollbackPolicyConfig::default(),
        }
    }
}

impl SafetyConfig {
    /// Validates the default threshold and every entry of both threshold
    /// maps.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `regression_threshold` is
    /// outside `[0, 1]` or any threshold pair fails [`ThresholdPair::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_unit_ratio("safety.regression_threshold", self.regression_threshold)?;
        for (name, pair) in &self.metric_thresholds {
            pair.validate(&format!("safety.metric_thresholds.{name}"))?;
        }
        for (name, pair) in &self.resource_thresholds {
            pair.validate(&format!("safety.resource_thresholds.{name}"))?;
        }
        self.rollback_policy.validate()?;
        Ok(())
    }
}

/// Rollback manager policy, set via `set_policy` or loaded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RollbackPolicyConfig {
    /// Whether automatic rollback is enabled at all.
    pub auto_enabled: bool,
    /// Relative regression threshold that triggers rollback.
    pub threshold: f64,
    /// Maximum parent versions walked during cascading rollback.
    pub max_attempts: u32,
    /// Whether cascading rollback (walking `parent_ids[0]`) is enabled.
    pub enable_cascading: bool,
    /// Whether failure-recovery rollback (triggered by workflow step
    /// failure rather than regression) is enabled.
    pub enable_failure_recovery: bool,
}

impl Default for RollbackPolicyConfig {
    fn default() -> Self {
        Self {
            auto_enabled: true,
            threshold: 0.1,
            max_attempts: 3,
            enable_cascading: true,
            enable_failure_recovery: true,
        }
    }
}

impl RollbackPolicyConfig {
    /// Validates the threshold and attempt bound.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `threshold` is outside
    /// `[0, 1]` or `max_attempts` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_unit_ratio("safety.rollback_policy.threshold", self.threshold)?;
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("safety.rollback_policy.max_attempts must be > 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Dashboard Config
// ============================================================================

/// Dashboard server bind address and streaming cadence (C10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DashboardConfig {
    /// Bind host. Defaults to loopback; never defaults to a public
    /// interface.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Interval between `metrics_update` streaming frames, in seconds.
    pub update_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DASHBOARD_HOST.to_string(),
            port: 8787,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
        }
    }
}

impl DashboardConfig {
    /// Validates the bind host and streaming interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `host` is empty or
    /// `update_interval_secs` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("dashboard.host must be non-empty".to_string()));
        }
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Invalid("dashboard.update_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Persistent storage backend location (C2, C11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub sqlite_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { sqlite_path: PathBuf::from("./data/evoseal.sqlite3") }
    }
}

impl StoreConfig {
    /// Validates the database path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the path is empty or oversized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_field("store.sqlite_path", &self.sqlite_path)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument, [`CONFIG_ENV_VAR`],
/// or [`DEFAULT_CONFIG_NAME`], in that order.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a resolved path's total length.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    Ok(())
}

/// Validates a path-valued configuration field.
fn validate_path_field(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates that `value` lies within the inclusive unit interval.
fn validate_unit_ratio(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!("{field} must be within [0, 1]")));
    }
    Ok(())
}

/// Reads `key` from the environment and parses it as `T`, returning `None`
/// when the variable is unset.
fn env_override<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|err| {
            ConfigError::Invalid(format!("environment override {key} is invalid: {err}"))
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid(format!("environment override {key} is not valid unicode")))
        }
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )]
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn dashboard_defaults_to_loopback() {
        assert_eq!(DashboardConfig::default().host, "127.0.0.1");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = EvolutionConfig::default();
        config.evolution_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn ratio_outside_unit_interval_is_rejected() {
        let mut config = EvolutionConfig::default();
        config.min_successful_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_threshold_pair_fails_safety_validation() {
        let mut config = SafetyConfig::default();
        config.metric_thresholds.insert(
            "latency_ms".to_string(),
            ThresholdPair {
                warn: 500.0,
                critical: 100.0,
                direction: crate::threshold::ThresholdDirection::LowerBetter,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_explicit_path_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("evoseal.toml");
        fs::write(&path, "[dashboard]\nport = 9000\n").expect("write");
        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.dashboard.port, 9000);
    }

    #[test]
    fn unknown_field_is_rejected_at_parse_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("evoseal.toml");
        fs::write(&path, "[dashboard]\nnonexistent_field = 1\n").expect("write");
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
