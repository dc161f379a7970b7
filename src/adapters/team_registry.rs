//! Team registry (relational) adapter (spec §6)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Location, PipelineError};

/// A rescue team row as returned by `QueryTeams` (spec §6). `team_type`
/// maps to a canonical `resource_type` via [`Team::resource_type`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub team_type: String,
    pub base_location: Location,
    pub base_address: String,
    pub total_personnel: u32,
    pub available_personnel: u32,
    pub capability_level: u8,
    pub response_time_minutes: Option<f64>,
    pub status: String,
    pub capabilities: Vec<String>,
    pub distance_km: f64,
}

impl Team {
    /// Fixed `team_type → resource_type` translation table (spec §6).
    /// Unknown types map to `RESCUE_TEAM`.
    pub fn resource_type(&self) -> &'static str {
        match self.team_type.as_str() {
            "fire_rescue" => "FIRE_TEAM",
            "medical" => "MEDICAL_TEAM",
            "search_rescue" => "RESCUE_TEAM",
            "hazmat" => "HAZMAT_TEAM",
            "engineering" => "ENGINEERING_TEAM",
            "logistics" => "LOGISTICS_TEAM",
            _ => "RESCUE_TEAM",
        }
    }
}

/// `QueryTeams(event_lat, event_lng, max_distance_km, max_teams)` adapter
/// contract (spec §6). The adapter itself applies the `status = "standby"`
/// filter and the distance-asc/capability-level-desc ordering; callers
/// only choose the radius and cap.
#[async_trait]
pub trait TeamRegistryAdapter: Send + Sync {
    async fn query_teams(
        &self,
        event_location: Location,
        max_distance_km: f64,
        max_teams: u32,
    ) -> Result<Vec<Team>, PipelineError>;
}

pub mod fakes {
    use super::*;

    /// Computes distance from `event_location` on every query, applies the
    /// standby filter, sorts distance-asc/capability-level-desc, and
    /// truncates to `max_teams` — matching the adapter contract exactly so
    /// the matcher's radius-expansion logic can be exercised end-to-end.
    pub struct StaticTeamRegistry {
        pub teams: Vec<Team>,
    }

    impl StaticTeamRegistry {
        pub fn new(teams: Vec<Team>) -> Self {
            Self { teams }
        }
    }

    #[async_trait]
    impl TeamRegistryAdapter for StaticTeamRegistry {
        async fn query_teams(
            &self,
            event_location: Location,
            max_distance_km: f64,
            max_teams: u32,
        ) -> Result<Vec<Team>, PipelineError> {
            let mut rows: Vec<Team> = self
                .teams
                .iter()
                .filter(|t| t.status == "standby")
                .map(|t| {
                    let mut t = t.clone();
                    t.distance_km = event_location.distance_km(&t.base_location);
                    t
                })
                .filter(|t| t.distance_km <= max_distance_km)
                .collect();
            rows.sort_by(|a, b| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap()
                    .then(b.capability_level.cmp(&a.capability_level))
            });
            rows.truncate(max_teams as usize);
            Ok(rows)
        }
    }

    /// Always fails at the transport layer (spec §7 `DBUnavailable`).
    pub struct FailingTeamRegistry;

    #[async_trait]
    impl TeamRegistryAdapter for FailingTeamRegistry {
        async fn query_teams(
            &self,
            _event_location: Location,
            _max_distance_km: f64,
            _max_teams: u32,
        ) -> Result<Vec<Team>, PipelineError> {
            Err(PipelineError::DbUnavailable("fixture transport failure".to_string()))
        }
    }
}
