// crates/evoseal-service/src/model.rs
// ============================================================================
// Module: Service Domain Types
// Description: The evolution sample, model version, and validation report
//              shapes the continuous evolution service accumulates.
// Purpose: Keep the five validation categories as named struct fields so a
//          missing category is a compile error, not a silent map gap.
// Dependencies: evoseal-core, serde
// ============================================================================

use evoseal_core::identifiers::ModelVersionId;
use evoseal_core::time::Timestamp;

/// One `(prompt_context, generated_code, evaluation_score, pattern_tags)`
/// observation extracted from a completed workflow iteration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvolutionSample {
    /// The prompt or task context the iteration was given.
    pub prompt_context: String,
    /// The code or artifact the iteration produced.
    pub generated_code: String,
    /// The iteration's evaluation score, in `[0, 1]`.
    pub evaluation_score: f64,
    /// Free-form tags describing the pattern this sample exemplifies.
    pub pattern_tags: Vec<String>,
    /// When this sample was recorded.
    pub recorded_at: Timestamp,
}

impl EvolutionSample {
    /// Returns whether this sample counts as a "successful" observation for
    /// `min_successful_ratio` purposes.
    #[must_use]
    pub fn is_successful(&self, success_threshold: f64) -> bool {
        self.evaluation_score >= success_threshold
    }
}

/// A candidate or deployed fine-tuned model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelVersion {
    /// Opaque identifier.
    pub id: ModelVersionId,
    /// The dataset size the training cycle that produced this version used.
    pub trained_on_samples: usize,
    /// The validation report that justified deploying (or rejecting) this
    /// version.
    pub validation: ValidationReport,
    /// When this version was created.
    pub created_at: Timestamp,
}

/// The five fixed validation categories `spec.md` §4.9 requires, each
/// scored in `[0, 1]`. A named field per category means a missing category
/// is caught at compile time rather than silently absent from a map.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationScores {
    /// Whether generated outputs are functionally correct.
    pub functional_correctness: f64,
    /// Subjective/structural quality of generated outputs.
    pub output_quality: f64,
    /// How well outputs follow the given instructions.
    pub instruction_following: f64,
    /// Safety and alignment of generated outputs.
    pub safety_alignment: f64,
    /// Inference latency, normalized so higher is better.
    pub performance_latency: f64,
}

impl ValidationScores {
    /// Returns the unweighted mean of all five categories.
    #[must_use]
    pub fn aggregate(&self) -> f64 {
        (self.functional_correctness
            + self.output_quality
            + self.instruction_following
            + self.safety_alignment
            + self.performance_latency)
            / 5.0
    }

    /// Returns whether every category clears `hard_floor`.
    #[must_use]
    pub fn meets_hard_floor(&self, hard_floor: f64) -> bool {
        self.functional_correctness >= hard_floor
            && self.output_quality >= hard_floor
            && self.instruction_following >= hard_floor
            && self.safety_alignment >= hard_floor
            && self.performance_latency >= hard_floor
    }
}

/// The outcome of validating a candidate model version.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    /// Per-category scores.
    pub scores: ValidationScores,
    /// `scores.aggregate()`, cached for convenience.
    pub aggregate: f64,
}

impl ValidationReport {
    /// Builds a report from `scores`, computing the aggregate.
    #[must_use]
    pub fn new(scores: ValidationScores) -> Self {
        Self { scores, aggregate: scores.aggregate() }
    }

    /// Returns whether this report clears `min_quality_for_deploy` and the
    /// per-category `hard_floor`.
    #[must_use]
    pub fn clears_deployment_bar(&self, min_quality_for_deploy: f64, hard_floor: f64) -> bool {
        self.aggregate >= min_quality_for_deploy && self.scores.meets_hard_floor(hard_floor)
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

    fn perfect_scores() -> ValidationScores {
        ValidationScores {
            functional_correctness: 0.9,
            output_quality: 0.8,
            instruction_following: 0.85,
            safety_alignment: 0.95,
            performance_latency: 0.7,
        }
    }

    #[test]
    fn aggregate_is_unweighted_mean() {
        let scores = perfect_scores();
        let expected = (0.9 + 0.8 + 0.85 + 0.95 + 0.7) / 5.0;
        assert!((scores.aggregate() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn one_low_category_fails_hard_floor() {
        let mut scores = perfect_scores();
        scores.safety_alignment = 0.1;
        assert!(!scores.meets_hard_floor(0.5));
    }

    #[test]
    fn report_requires_both_aggregate_and_floor() {
        let report = ValidationReport::new(perfect_scores());
        assert!(report.clears_deployment_bar(0.7, 0.5));
        let mut low_floor_scores = perfect_scores();
        low_floor_scores.performance_latency = 0.0;
        let low_floor_report = ValidationReport::new(low_floor_scores);
        assert!(!low_floor_report.clears_deployment_bar(0.7, 0.5));
    }
}
