//! Hard (veto) rule definitions (spec §4.6, §9 "Dynamic-dispatch configuration")

use serde::{Deserialize, Serialize};

use crate::types::{AllocationSolution, ParsedDisaster};

/// A veto predicate over an `AllocationSolution` (and, for context, the
/// `ParsedDisaster`). A closed tagged enum per the design note in spec §9:
/// "hard rules ... are values in a config store ... a tagged predicate
/// object with a fixed set of variants" — new rule kinds are added by
/// extending this enum, not by adding runtime-typed callables.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HardRule {
    MinTeams(u32),
    MaxResponseTimeMinutes(f64),
    MinCoverageRate(f64),
}

impl HardRule {
    /// Evaluates the rule against a solution, returning a human-readable
    /// violation message on failure.
    pub fn check(&self, solution: &AllocationSolution, _disaster: &ParsedDisaster) -> Result<(), String> {
        match *self {
            HardRule::MinTeams(min) => {
                if (solution.teams_count as u32) < min {
                    return Err(format!(
                        "teams_count {} below required minimum {}",
                        solution.teams_count, min
                    ));
                }
            }
            HardRule::MaxResponseTimeMinutes(max) => {
                if solution.response_time_min > max {
                    return Err(format!(
                        "response_time_min {:.1} exceeds cap {:.1}",
                        solution.response_time_min, max
                    ));
                }
            }
            HardRule::MinCoverageRate(min) => {
                if solution.coverage_rate < min {
                    return Err(format!(
                        "coverage_rate {:.2} below floor {:.2}",
                        solution.coverage_rate, min
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Default hard-rule set, used when no config file overrides it. Matches
/// the "typical rules" named in spec §4.6: `teams_count ≥ 1`,
/// `response_time_min ≤ configured cap`, `coverage_rate ≥ floor`.
pub fn default_hard_rules() -> Vec<HardRule> {
    vec![
        HardRule::MinTeams(1),
        HardRule::MaxResponseTimeMinutes(120.0),
        HardRule::MinCoverageRate(0.70),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AllocationSolution, BuildingDamageLevel, DisasterType, Severity};
    use std::collections::HashSet;

    fn disaster() -> ParsedDisaster {
        ParsedDisaster {
            disaster_type: DisasterType::Earthquake,
            severity: Severity::High,
            magnitude: None,
            depth_km: None,
            location: None,
            affected_area_km2: None,
            disaster_level: None,
            building_damage_level: BuildingDamageLevel::Unknown,
            has_trapped_people: false,
            has_hazmat_release: false,
            has_infrastructure_collapse: false,
            has_fire: false,
            estimated_trapped: None,
            affected_population: None,
            additional_info: Default::default(),
        }
    }

    #[test]
    fn min_teams_rejects_empty_solution() {
        let sol = AllocationSolution::build("s".into(), vec![], &HashSet::new());
        assert!(HardRule::MinTeams(1).check(&sol, &disaster()).is_err());
    }

    #[test]
    fn min_coverage_rate_passes_full_coverage() {
        let sol = AllocationSolution::build("s".into(), vec![], &HashSet::new());
        assert!(HardRule::MinCoverageRate(0.5).check(&sol, &disaster()).is_ok());
    }
}
