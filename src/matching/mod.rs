//! Resource Matcher stage (spec §4.5)
//!
//! Determines a disaster-scale team cap, queries the team registry with
//! radius expansion until required capabilities are covered (or the 300 km
//! ceiling is hit), scores candidates, and discards teams with no
//! capability overlap.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::adapters::TeamRegistryAdapter;
use crate::config::defaults::{
    AVERAGE_SPEED_KMH, CAPABILITY_SCORE_WEIGHT, CAP_CATASTROPHIC, CAP_LARGE, CAP_MEDIUM, CAP_SMALL,
    DISTANCE_SCORE_WEIGHT, LEVEL_SCORE_WEIGHT, MAX_SEARCH_RADIUS_KM, RADIUS_EXPANSION_STEP_KM,
};
use crate::types::{Location, ParsedDisaster, PipelineError, ResourceCandidate, Severity, Trace};

/// Disaster-scale team cap (spec §4.5 "Disaster scale"), overridden by
/// `constraints.max_teams` when present.
pub fn disaster_scale_cap(disaster: &ParsedDisaster, max_teams_override: Option<u32>) -> u32 {
    if let Some(cap) = max_teams_override {
        return cap;
    }

    let affected_population = disaster.affected_population.unwrap_or(0.0);
    let estimated_trapped = disaster.estimated_trapped.unwrap_or(0);
    let is_earthquake = matches!(disaster.disaster_type, crate::types::DisasterType::Earthquake);
    let is_critical = matches!(disaster.severity, Severity::Critical);

    if is_earthquake || (is_critical && (affected_population > 10_000.0 || estimated_trapped > 100)) {
        return CAP_CATASTROPHIC;
    }
    if is_critical && (affected_population > 1_000.0 || estimated_trapped > 50) {
        return CAP_LARGE;
    }
    if estimated_trapped > 50 {
        return CAP_LARGE;
    }
    if estimated_trapped > 10 {
        return CAP_MEDIUM;
    }
    match disaster.severity {
        Severity::Critical | Severity::High => CAP_LARGE,
        Severity::Moderate => CAP_MEDIUM,
        Severity::Low => CAP_SMALL,
    }
}

pub struct MatchResult {
    pub candidates: Vec<ResourceCandidate>,
    pub search_expanded: bool,
    pub initial_distance_km: f64,
    pub final_distance_km: f64,
}

/// Runs the Matcher stage (spec §4.5 "Query", "Radius expansion",
/// "Candidate scoring").
pub async fn run(
    event_location: Location,
    disaster: &ParsedDisaster,
    max_response_time_hours: f64,
    max_teams_override: Option<u32>,
    required_capabilities: &HashSet<String>,
    registry: &dyn TeamRegistryAdapter,
    trace: &mut Trace,
) -> Result<MatchResult, PipelineError> {
    let cap = disaster_scale_cap(disaster, max_teams_override);
    let initial_radius_km = max_response_time_hours * AVERAGE_SPEED_KMH;
    let mut radius_km = initial_radius_km;

    let mut candidates = score_and_filter(
        &query_and_count(registry, event_location, radius_km, cap, trace).await?,
        event_location,
        required_capabilities,
        max_response_time_hours,
    );

    let mut expanded = false;
    while !covers_all(&candidates, required_capabilities) && radius_km < MAX_SEARCH_RADIUS_KM {
        radius_km = (radius_km + RADIUS_EXPANSION_STEP_KM).min(MAX_SEARCH_RADIUS_KM);
        expanded = true;
        candidates = score_and_filter(
            &query_and_count(registry, event_location, radius_km, cap, trace).await?,
            event_location,
            required_capabilities,
            max_response_time_hours,
        );
    }

    if expanded {
        trace.note_bool("search_expanded", true);
        trace.note("initial_distance_km", initial_radius_km);
        trace.note("final_distance_km", radius_km);
    }

    if !covers_all(&candidates, required_capabilities) {
        let missing: Vec<&str> = required_capabilities
            .iter()
            .filter(|c| !candidates.iter().any(|cand| cand.capabilities.contains(c)))
            .map(String::as_str)
            .collect();
        warn!(missing = ?missing, "matcher could not cover all required capabilities within max radius");
    }

    candidates.sort_by(|a, b| b.match_score.partial_cmp(&a.match_score).unwrap());

    if candidates.is_empty() {
        return Err(PipelineError::NoCandidates);
    }

    debug!(candidates = candidates.len(), radius_km, "matcher complete");

    Ok(MatchResult {
        candidates,
        search_expanded: expanded,
        initial_distance_km: initial_radius_km,
        final_distance_km: radius_km,
    })
}

async fn query_and_count(
    registry: &dyn TeamRegistryAdapter,
    event_location: Location,
    radius_km: f64,
    cap: u32,
    trace: &mut Trace,
) -> Result<Vec<crate::adapters::Team>, PipelineError> {
    let teams = registry.query_teams(event_location, radius_km, cap).await?;
    trace.note("last_query_radius_km", radius_km);
    Ok(teams)
}

fn covers_all(candidates: &[ResourceCandidate], required: &HashSet<String>) -> bool {
    required
        .iter()
        .all(|cap| candidates.iter().any(|candidate| candidate.capabilities.contains(cap)))
}

/// Scores every queried team and discards those with no overlap with
/// `required` (spec §4.5 "Candidate scoring").
fn score_and_filter(
    teams: &[crate::adapters::Team],
    event_location: Location,
    required: &HashSet<String>,
    max_response_time_hours: f64,
) -> Vec<ResourceCandidate> {
    teams
        .iter()
        .filter_map(|team| {
            let overlap: Vec<String> = team
                .capabilities
                .iter()
                .filter(|c| required.contains(*c))
                .cloned()
                .collect();
            if overlap.is_empty() {
                return None;
            }

            let distance_km = event_location.distance_km(&team.base_location);
            let eta_minutes = distance_km / AVERAGE_SPEED_KMH * 60.0;

            let capability_score = overlap.len() as f64 / required.len().max(1) as f64;
            let distance_score = (1.0 - distance_km / (max_response_time_hours * AVERAGE_SPEED_KMH)).max(0.0);
            let level_score = team.capability_level as f64 / 5.0;
            let match_score = CAPABILITY_SCORE_WEIGHT * capability_score
                + DISTANCE_SCORE_WEIGHT * distance_score
                + LEVEL_SCORE_WEIGHT * level_score;

            Some(ResourceCandidate {
                team_id: team.id.clone(),
                team_name: team.name.clone(),
                resource_type: team.resource_type().to_string(),
                capabilities: team.capabilities.clone(),
                location: team.base_location,
                distance_km,
                eta_minutes,
                capability_level: team.capability_level,
                personnel: team.available_personnel,
                match_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::team_registry::fakes::StaticTeamRegistry;
    use crate::adapters::Team;
    use crate::types::{BuildingDamageLevel, DisasterType};

    fn team(id: &str, km_lat_offset: f64, capabilities: Vec<&str>) -> Team {
        Team {
            id: id.to_string(),
            name: format!("Team {id}"),
            team_type: "search_rescue".to_string(),
            base_location: Location::new(31.68 + km_lat_offset, 103.85),
            base_address: "addr".to_string(),
            total_personnel: 10,
            available_personnel: 10,
            capability_level: 4,
            response_time_minutes: None,
            status: "standby".to_string(),
            capabilities: capabilities.into_iter().map(String::from).collect(),
            distance_km: 0.0,
        }
    }

    fn disaster() -> ParsedDisaster {
        ParsedDisaster {
            disaster_type: DisasterType::Earthquake,
            severity: Severity::Critical,
            magnitude: Some(6.5),
            depth_km: Some(10.0),
            location: None,
            affected_area_km2: None,
            disaster_level: None,
            building_damage_level: BuildingDamageLevel::Collapsed,
            has_trapped_people: true,
            has_hazmat_release: false,
            has_infrastructure_collapse: true,
            has_fire: false,
            estimated_trapped: Some(200),
            affected_population: Some(15000.0),
            additional_info: Default::default(),
        }
    }

    #[tokio::test]
    async fn candidates_with_no_capability_overlap_are_discarded() {
        let registry = StaticTeamRegistry::new(vec![team("t1", 0.1, vec!["LOGISTICS"])]);
        let required: HashSet<String> = ["LIFE_DETECTION".to_string()].into();
        let mut trace = Trace::new();
        let result = run(
            Location::new(31.68, 103.85),
            &disaster(),
            2.0,
            None,
            &required,
            &registry,
            &mut trace,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::NoCandidates)));
    }

    #[tokio::test]
    async fn radius_expands_until_required_capability_covered() {
        let registry = StaticTeamRegistry::new(vec![
            team("near", 0.1, vec!["LOGISTICS"]),
            team("far", 1.2, vec!["LIFE_DETECTION"]), // ~133km north
        ]);
        let required: HashSet<String> = ["LIFE_DETECTION".to_string()].into();
        let mut trace = Trace::new();
        let result = run(
            Location::new(31.68, 103.85),
            &disaster(),
            0.5, // initial radius 20km, too small to find "far"
            None,
            &required,
            &registry,
            &mut trace,
        )
        .await
        .unwrap();
        assert!(result.search_expanded);
        assert!(result.candidates.iter().any(|c| c.team_id == "far"));
    }

    #[test]
    fn catastrophic_scale_applies_to_earthquakes() {
        assert_eq!(disaster_scale_cap(&disaster(), None), CAP_CATASTROPHIC);
    }

    #[test]
    fn max_teams_override_takes_precedence() {
        assert_eq!(disaster_scale_cap(&disaster(), Some(7)), 7);
    }
}
