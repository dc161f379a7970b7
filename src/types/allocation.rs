//! Allocator stage output types (spec §3, §4.5)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One team's assignment within a candidate allocation solution (spec §3
/// "AllocationSolution.allocations" list item).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResourceAssignment {
    pub team_id: String,
    pub team_name: String,
    pub assigned_capabilities: Vec<String>,
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub match_score: f64,
}

/// A candidate allocation produced by NSGA-II or the greedy fallback —
/// one point on (or near) the Pareto front before rule-based evaluation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AllocationSolution {
    pub solution_id: String,
    pub assignments: Vec<ResourceAssignment>,
    /// `max(eta_minutes)` across assignments, or 0 if empty (spec §3 invariant).
    pub response_time_min: f64,
    /// `|union(assigned_capabilities) ∩ required| / |required|`.
    pub coverage_rate: f64,
    /// `1 − coverage_rate`.
    pub risk_level: f64,
    /// Mean `match_score` across assignments (spec §3 "total_score").
    pub total_score: f64,
    pub uncovered_capabilities: Vec<String>,
    pub teams_count: usize,
    pub total_capacity: u32,
}

impl AllocationSolution {
    /// Builds a solution from a set of assignments plus the full required
    /// capability set, deriving `response_time_min`, `coverage_rate`,
    /// `risk_level`, `total_score`, `uncovered_capabilities` and
    /// `teams_count` per the spec §3 formulas. Empty `required` yields
    /// `coverage_rate = 1.0` by convention (spec §8 boundary behavior).
    pub fn build(
        solution_id: String,
        assignments: Vec<ResourceAssignment>,
        required: &HashSet<String>,
    ) -> Self {
        let covered: HashSet<&str> = assignments
            .iter()
            .flat_map(|a| a.assigned_capabilities.iter().map(String::as_str))
            .collect();
        let coverage_rate = if required.is_empty() {
            1.0
        } else {
            let hit = required.iter().filter(|c| covered.contains(c.as_str())).count();
            hit as f64 / required.len() as f64
        };
        let response_time_min = assignments
            .iter()
            .map(|a| a.eta_minutes)
            .fold(0.0_f64, f64::max);
        let total_score = if assignments.is_empty() {
            0.0
        } else {
            assignments.iter().map(|a| a.match_score).sum::<f64>() / assignments.len() as f64
        };
        let uncovered_capabilities: Vec<String> = required
            .iter()
            .filter(|c| !covered.contains(c.as_str()))
            .cloned()
            .collect();
        let teams_count = assignments.len();
        Self {
            solution_id,
            teams_count,
            coverage_rate,
            risk_level: 1.0 - coverage_rate,
            response_time_min,
            total_score,
            uncovered_capabilities,
            total_capacity: 0,
            assignments,
        }
    }

    /// Invariant: `risk_level == 1.0 - coverage_rate` (spec §8).
    pub fn risk_matches_coverage(&self) -> bool {
        (self.risk_level - (1.0 - self.coverage_rate)).abs() < 1e-6
    }

    /// Invariant: no team id appears twice within one solution (spec §8).
    pub fn has_unique_team_ids(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.assignments.len());
        self.assignments.iter().all(|a| seen.insert(&a.team_id))
    }

    /// Dedup key: the set of assigned team ids, independent of order.
    pub fn team_id_set(&self) -> HashSet<&str> {
        self.assignments.iter().map(|a| a.team_id.as_str()).collect()
    }
}
