// crates/evoseal-orchestrator/src/dag.rs
// ============================================================================
// Module: Step Graph
// Description: Pure DAG validation over a workflow's steps — topological
//              ordering, cycle detection, readiness-wave batching.
// Purpose: Separate graph shape validation from the execution strategy that
//          decides how a ready wave is dispatched.
// Dependencies: evoseal-core
// ============================================================================

//! ## Overview
//! [`topological_waves`] runs Kahn's algorithm over a step set's
//! `dependencies`, grouping steps into successive "waves" — each wave holds
//! every step whose dependencies are fully satisfied by prior waves. This is
//! independent of `execution_strategy`: a `sequential` strategy still walks
//! waves one step at a time, while `parallel`/`adaptive` may dispatch an
//! entire wave concurrently.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use evoseal_core::model::WorkflowStep;

use crate::error::OrchestratorError;

/// Steps grouped into successive readiness waves.
pub type Waves = Vec<Vec<WorkflowStep>>;

/// Topologically sorts `steps` into readiness waves, or reports the first
/// structural defect found.
///
/// # Errors
///
/// Returns [`OrchestratorError::InvalidGraph`] when a step names a
/// dependency absent from `steps`, or when the graph contains a cycle.
#[expect(clippy::expect_used, reason = "every expect below is guarded by indegree/by_id being built from the same step set")]
pub fn topological_waves(steps: &[WorkflowStep]) -> Result<Waves, OrchestratorError> {
    let known: BTreeSet<&str> = steps.iter().map(|step| step.step_id.as_str()).collect();
    for step in steps {
        for dependency in &step.dependencies {
            if !known.contains(dependency.as_str()) {
                return Err(OrchestratorError::InvalidGraph(format!(
                    "step {} depends on unknown step {dependency}",
                    step.step_id
                )));
            }
        }
    }

    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for step in steps {
        indegree.entry(step.step_id.as_str()).or_insert(0);
        for dependency in &step.dependencies {
            *indegree.entry(step.step_id.as_str()).or_insert(0) += 1;
            dependents.entry(dependency.as_str()).or_default().push(step.step_id.as_str());
        }
    }

    let by_id: BTreeMap<&str, &WorkflowStep> = steps.iter().map(|step| (step.step_id.as_str(), step)).collect();
    let mut ready: VecDeque<&str> = indegree
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut remaining = indegree;
    let mut waves: Waves = Vec::new();
    let mut visited = 0usize;

    while !ready.is_empty() {
        let mut wave = Vec::new();
        let frontier: Vec<&str> = ready.drain(..).collect();
        for id in frontier {
            wave.push((*by_id.get(id).expect("step present in by_id")).clone());
            visited += 1;
            if let Some(next_ids) = dependents.get(id) {
                for &next in next_ids {
                    let count = remaining.get_mut(next).expect("dependent tracked in indegree map");
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }
        wave.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.step_id.as_str().cmp(b.step_id.as_str())));
        waves.push(wave);
    }

    if visited != steps.len() {
        return Err(OrchestratorError::InvalidGraph("step dependency graph contains a cycle".to_string()));
    }
    Ok(waves)
}
