//! Allocator stage (spec §4.5 "Responsibility (allocator)")
//!
//! NSGA-II selects a Pareto front of candidate subsets over `(max eta,
//! -coverage_rate, teams_count)` when there are enough candidates to make a
//! metaheuristic worthwhile; the greedy fallback covers the small-candidate
//! case and any NSGA-II setup failure.

mod greedy;
mod nsga2;

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::defaults::NSGA2_MIN_CANDIDATES;
use crate::types::{AllocationSolution, PipelineError, ResourceCandidate, Trace};

pub struct AllocationResult {
    pub solutions: Vec<AllocationSolution>,
    pub algorithm_used: String,
}

/// Runs the Allocator stage (spec §4.5 "Algorithm selection").
pub fn run(
    candidates: &[ResourceCandidate],
    required: &HashSet<String>,
    n_alternatives: usize,
    trace: &mut Trace,
) -> Result<AllocationResult, PipelineError> {
    if candidates.is_empty() {
        return Err(PipelineError::NoCandidates);
    }

    let (mut solutions, algorithm_used) = if candidates.len() > NSGA2_MIN_CANDIDATES {
        match nsga2::optimize(candidates, required) {
            Ok(solutions) if !solutions.is_empty() => (solutions, "nsga2".to_string()),
            Ok(_) => {
                warn!("NSGA-II produced no feasible decoded solution, falling back to greedy");
                trace.note("optimization_failed", "no feasible solution");
                (greedy::allocate(candidates, required), "greedy".to_string())
            }
            Err(e) => {
                warn!(error = %e, "NSGA-II setup failed, falling back to greedy");
                trace.note("optimization_failed", e.to_string());
                (greedy::allocate(candidates, required), "greedy".to_string())
            }
        }
    } else {
        (greedy::allocate(candidates, required), "greedy".to_string())
    };

    dedup_by_team_set(&mut solutions);
    solutions.sort_by(|a, b| b.coverage_rate.partial_cmp(&a.coverage_rate).unwrap());
    solutions.truncate(n_alternatives);

    if solutions.is_empty() {
        return Err(PipelineError::NoSolution);
    }

    info!(algorithm = %algorithm_used, solutions = solutions.len(), "allocator complete");
    trace.note("algorithm_used", algorithm_used.clone());

    Ok(AllocationResult { solutions, algorithm_used })
}

/// Dedup by the frozen set of resource ids each solution contains (spec
/// §4.5 "Post-processing"). Keeps the first occurrence.
fn dedup_by_team_set(solutions: &mut Vec<AllocationSolution>) {
    let mut seen: Vec<HashSet<String>> = vec![];
    solutions.retain(|sol| {
        let ids: HashSet<String> = sol.assignments.iter().map(|a| a.team_id.clone()).collect();
        if seen.contains(&ids) {
            false
        } else {
            seen.push(ids);
            true
        }
    });
}

/// Per-allocation capability assignment shared by both algorithms (spec
/// §4.5 "Per-allocation capability assignment"): assigned capabilities are
/// the candidate's intersection with `required`, minus what earlier-selected
/// candidates in this solution already cover. `fallback_full_intersection`
/// implements the greedy variant's "assign the full intersection instead"
/// rule when the leftover set would be empty.
pub(crate) fn assign_capabilities(
    candidate: &ResourceCandidate,
    required: &HashSet<String>,
    already_covered: &HashSet<String>,
    fallback_full_intersection: bool,
) -> Vec<String> {
    let intersection: Vec<String> =
        candidate.capabilities.iter().filter(|c| required.contains(*c)).cloned().collect();
    let leftover: Vec<String> =
        intersection.iter().filter(|c| !already_covered.contains(*c)).cloned().collect();
    if leftover.is_empty() && fallback_full_intersection {
        intersection
    } else {
        leftover
    }
}
