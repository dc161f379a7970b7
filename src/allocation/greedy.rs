//! Greedy fallback allocator (spec §4.5 "Greedy fallback")

use std::collections::HashSet;

use crate::allocation::assign_capabilities;
use crate::types::{AllocationSolution, ResourceAssignment, ResourceCandidate};

/// Emits up to three solutions by differing selection orders: highest
/// `match_score`, nearest-first, and availability order (a no-op reorder
/// since availability is uniformly 1.0 post-status-filter).
pub fn allocate(candidates: &[ResourceCandidate], required: &HashSet<String>) -> Vec<AllocationSolution> {
    let mut by_match_score: Vec<&ResourceCandidate> = candidates.iter().collect();
    by_match_score.sort_by(|a, b| b.match_score.partial_cmp(&a.match_score).unwrap());

    let mut by_distance: Vec<&ResourceCandidate> = candidates.iter().collect();
    by_distance.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap());

    let by_availability: Vec<&ResourceCandidate> = candidates.iter().collect();

    vec![
        ("greedy-match-score", by_match_score),
        ("greedy-nearest", by_distance),
        ("greedy-availability", by_availability),
    ]
    .into_iter()
    .map(|(label, ordering)| build_solution(label, &ordering, required))
    .collect()
}

fn build_solution(
    label: &str,
    ordering: &[&ResourceCandidate],
    required: &HashSet<String>,
) -> AllocationSolution {
    let mut covered: HashSet<String> = HashSet::new();
    let mut assignments = vec![];

    for candidate in ordering {
        if !required.is_empty() && covered.is_superset(required) {
            break;
        }
        let contributes =
            candidate.capabilities.iter().any(|c| required.contains(c) && !covered.contains(c));
        if !contributes {
            continue;
        }
        let assigned = assign_capabilities(candidate, required, &covered, true);
        covered.extend(assigned.iter().cloned());
        assignments.push(ResourceAssignment {
            team_id: candidate.team_id.clone(),
            team_name: candidate.team_name.clone(),
            assigned_capabilities: assigned,
            distance_km: candidate.distance_km,
            eta_minutes: candidate.eta_minutes,
            match_score: candidate.match_score,
        });
    }

    AllocationSolution::build(label.to_string(), assignments, required)
}
