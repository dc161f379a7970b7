//! Resource Matcher stage output types (spec §3, §4.5)

use serde::{Deserialize, Serialize};

use crate::config::defaults::{TEAM_CAPACITY_FLOOR, TEAM_CAPACITY_PER_PERSONNEL};
use crate::types::Location;

/// A candidate response team surfaced by the team registry adapter and
/// scored by the matcher, before allocation (spec §3 "ResourceCandidate").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResourceCandidate {
    pub team_id: String,
    pub team_name: String,
    pub resource_type: String,
    pub capabilities: Vec<String>,
    pub location: Location,
    pub distance_km: f64,
    /// `distance_km / average_speed_kmh * 60` (spec §3 invariant).
    pub eta_minutes: f64,
    /// 1..5 (spec §3).
    pub capability_level: u8,
    pub personnel: u32,
    /// `0.50*capability_score + 0.30*distance_score + 0.20*level_score`
    /// (spec §4.5 "Candidate scoring").
    pub match_score: f64,
}

impl ResourceCandidate {
    /// Invariant: `distance_km ≥ 0` (spec §3); `eta_minutes` derives from
    /// it and is therefore also non-negative, `match_score` stays in
    /// `[0, 1]`, and `capability_level` is within the declared 1..5 range.
    pub fn is_valid(&self) -> bool {
        self.distance_km >= 0.0
            && self.eta_minutes >= 0.0
            && (1..=5).contains(&self.capability_level)
            && (0.0..=1.0).contains(&self.match_score)
    }

    /// Per-team rescue capacity used by the catastrophe-mode capacity-gap
    /// computation: `personnel * 2`, floored at 5 (spec §4.6).
    pub fn rescue_capacity(&self) -> i64 {
        (self.personnel as i64 * TEAM_CAPACITY_PER_PERSONNEL).max(TEAM_CAPACITY_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResourceCandidate {
        ResourceCandidate {
            team_id: "team-1".to_string(),
            team_name: "Alpha Rescue".to_string(),
            resource_type: "RESCUE_TEAM".to_string(),
            capabilities: vec!["search_and_rescue".to_string()],
            location: Location::new(31.0, 104.0),
            distance_km: 12.5,
            eta_minutes: 18.75,
            capability_level: 4,
            personnel: 10,
            match_score: 0.82,
        }
    }

    #[test]
    fn valid_candidate_passes_invariant_check() {
        assert!(sample().is_valid());
    }

    #[test]
    fn negative_distance_fails_invariant_check() {
        let mut c = sample();
        c.distance_km = -1.0;
        assert!(!c.is_valid());
    }

    #[test]
    fn rescue_capacity_applies_floor_for_small_teams() {
        let mut c = sample();
        c.personnel = 1;
        assert_eq!(c.rescue_capacity(), 5);
    }

    #[test]
    fn rescue_capacity_scales_with_personnel_above_floor() {
        let c = sample();
        assert_eq!(c.rescue_capacity(), 20);
    }
}
