// crates/evoseal-orchestrator/src/resource.rs
// ============================================================================
// Module: Resource Monitor
// Description: Periodic sampling of {cpu, memory, disk, net} against
//              per-dimension warn/critical thresholds.
// Purpose: Let the orchestrator react to resource pressure without coupling
//          to a specific sampling backend.
// Dependencies: evoseal-config
// ============================================================================

//! ## Overview
//! [`ResourceSampler`] is the seam that lets tests supply deterministic
//! samples instead of reading real `/proc` values; [`ResourceMonitor`] holds
//! a bounded history window and classifies each sample's dimensions against
//! [`ThresholdPair`]s from [`evoseal_config::SafetyConfig::resource_thresholds`].

use std::collections::BTreeMap;
use std::collections::VecDeque;

use evoseal_config::ThresholdPair;

/// One point-in-time resource reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceSample {
    /// CPU utilization, in `[0, 1]`.
    pub cpu: f64,
    /// Memory utilization, in `[0, 1]`.
    pub memory: f64,
    /// Disk utilization, in `[0, 1]`.
    pub disk: f64,
    /// Network utilization, in `[0, 1]`.
    pub net: f64,
}

impl ResourceSample {
    /// Returns the named dimension's value, or `None` for an unrecognized
    /// dimension name.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<f64> {
        match name {
            "cpu" => Some(self.cpu),
            "memory" => Some(self.memory),
            "disk" => Some(self.disk),
            "net" => Some(self.net),
            _ => None,
        }
    }
}

/// The severity of a crossed resource threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// Past `warn` but not `critical`.
    Warn,
    /// Past `critical`.
    Critical,
}

/// A single dimension crossing its configured threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAlert {
    /// Which dimension crossed (`cpu`, `memory`, `disk`, `net`).
    pub dimension: String,
    /// How severely it crossed.
    pub level: AlertLevel,
    /// The sampled value that triggered the alert.
    pub value: f64,
}

/// Supplies resource samples to a [`ResourceMonitor`]; production code reads
/// real OS counters, tests supply a deterministic sequence.
pub trait ResourceSampler: Send + Sync {
    /// Returns the current resource utilization snapshot.
    fn sample(&self) -> ResourceSample;
}

/// Tracks a bounded history of samples and classifies each against
/// configured thresholds.
pub struct ResourceMonitor {
    sampler: Box<dyn ResourceSampler>,
    thresholds: BTreeMap<String, ThresholdPair>,
    history: VecDeque<ResourceSample>,
    history_capacity: usize,
}

impl ResourceMonitor {
    /// Builds a monitor over `sampler`, retaining up to `history_capacity`
    /// samples and classifying against `thresholds`.
    #[must_use]
    pub fn new(sampler: Box<dyn ResourceSampler>, thresholds: BTreeMap<String, ThresholdPair>, history_capacity: usize) -> Self {
        Self { sampler, thresholds, history: VecDeque::new(), history_capacity: history_capacity.max(1) }
    }

    /// Takes one sample, retains it in history, and returns any alerts the
    /// sample raised.
    pub fn poll(&mut self) -> Vec<ResourceAlert> {
        let sample = self.sampler.sample();
        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample);
        self.classify(sample)
    }

    /// Returns the retained sample history, oldest first.
    #[must_use]
    pub fn history(&self) -> &VecDeque<ResourceSample> {
        &self.history
    }

    fn classify(&self, sample: ResourceSample) -> Vec<ResourceAlert> {
        let mut alerts = Vec::new();
        for (dimension, pair) in &self.thresholds {
            let Some(value) = sample.dimension(dimension) else { continue };
            let level = if value >= pair.critical {
                Some(AlertLevel::Critical)
            } else if value >= pair.warn {
                Some(AlertLevel::Warn)
            } else {
                None
            };
            if let Some(level) = level {
                alerts.push(ResourceAlert { dimension: dimension.clone(), level, value });
            }
        }
        alerts
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
    use evoseal_config::ThresholdDirection;

    use super::*;

    struct FixedSampler(ResourceSample);

    impl ResourceSampler for FixedSampler {
        fn sample(&self) -> ResourceSample {
            self.0
        }
    }

    fn thresholds() -> BTreeMap<String, ThresholdPair> {
        BTreeMap::from([(
            "cpu".to_string(),
            ThresholdPair { warn: 0.7, critical: 0.9, direction: ThresholdDirection::LowerBetter },
        )])
    }

    #[test]
    fn sample_below_warn_raises_no_alert() {
        let mut monitor = ResourceMonitor::new(Box::new(FixedSampler(ResourceSample { cpu: 0.3, ..Default::default() })), thresholds(), 10);
        assert!(monitor.poll().is_empty());
    }

    #[test]
    fn sample_past_critical_raises_critical_alert() {
        let mut monitor = ResourceMonitor::new(Box::new(FixedSampler(ResourceSample { cpu: 0.95, ..Default::default() })), thresholds(), 10);
        let alerts = monitor.poll();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn history_window_is_bounded() {
        let mut monitor = ResourceMonitor::new(Box::new(FixedSampler(ResourceSample::default())), thresholds(), 2);
        for _ in 0..5 {
            monitor.poll();
        }
        assert_eq!(monitor.history().len(), 2);
    }
}
