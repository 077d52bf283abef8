// crates/evoseal-service/src/data_collector.rs
// ============================================================================
// Module: Evolution Data Collector
// Description: Accumulates evolution samples from completed iterations and
//              decides when enough have landed to justify a training cycle.
// Purpose: Serialize evolution-loop writes and training-loop reads behind a
//          single mutex, per spec.md §5's DataCollector ordering guarantee.
// Dependencies: evoseal-core, tokio
// ============================================================================

//! ## Overview
//! A single `tokio::sync::Mutex` guards the sample log, so the evolution
//! loop's appends and the training loop's reads never interleave — the same
//! "serialized via mutex/actor" guarantee `spec.md` §5 calls for DataCollector
//! access.

use tokio::sync::Mutex;

use crate::model::EvolutionSample;

/// Accumulates [`EvolutionSample`]s and reports training readiness.
pub struct EvolutionDataCollector {
    /// All samples recorded so far, oldest first.
    samples: Mutex<Vec<EvolutionSample>>,
}

impl EvolutionDataCollector {
    /// Builds an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self { samples: Mutex::new(Vec::new()) }
    }

    /// Appends one sample.
    pub async fn record(&self, sample: EvolutionSample) {
        self.samples.lock().await.push(sample);
    }

    /// Returns whether at least `min_samples` samples are recorded and at
    /// least `min_successful_ratio` of them clear `success_threshold`.
    pub async fn ready_for_training(&self, min_samples: u64, min_successful_ratio: f64, success_threshold: f64) -> bool {
        let samples = self.samples.lock().await;
        if samples.len() < min_samples as usize {
            return false;
        }
        #[expect(clippy::cast_precision_loss, reason = "sample counts are small enough for exact f64 representation in practice")]
        let successful = samples.iter().filter(|sample| sample.is_successful(success_threshold)).count() as f64;
        #[expect(clippy::cast_precision_loss, reason = "sample counts are small enough for exact f64 representation in practice")]
        let ratio = successful / samples.len() as f64;
        ratio >= min_successful_ratio
    }

    /// Returns a snapshot of the most recent `limit` samples, newest last.
    pub async fn recent_patterns(&self, limit: usize) -> Vec<EvolutionSample> {
        let samples = self.samples.lock().await;
        let start = samples.len().saturating_sub(limit);
        samples[start..].to_vec()
    }

    /// Returns the total number of samples recorded.
    pub async fn len(&self) -> usize {
        self.samples.lock().await.len()
    }

    /// Returns whether no samples have been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for EvolutionDataCollector {
    fn default() -> Self {
        Self::new()
    }
}
