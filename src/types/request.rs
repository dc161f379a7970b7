//! Inbound request types (spec §3 "Request")

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A location in WGS-84 decimal degrees.
///
/// `structured_input.location` in the source system mixes two key
/// conventions (`latitude`/`longitude` and `lat`/`lng`); [`Location`]'s
/// `Deserialize` impl accepts either so callers never have to normalize
/// the key themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in kilometers (haversine).
    pub fn distance_km(&self, other: &Location) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            latitude: Option<f64>,
            longitude: Option<f64>,
            lat: Option<f64>,
            lng: Option<f64>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let latitude = raw.latitude.or(raw.lat).unwrap_or(0.0);
        let longitude = raw.longitude.or(raw.lng).unwrap_or(0.0);
        Ok(Location { latitude, longitude })
    }
}

/// Structured hints accompanying the free-text disaster description.
///
/// Every field is optional: the Understanding stage's LLM parse is the
/// primary source of truth, this is only a hint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StructuredInput {
    pub location: Option<Location>,
    pub disaster_type: Option<String>,
    pub event_time: Option<chrono::DateTime<chrono::Utc>>,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub rainfall_mm: Option<f64>,
    pub wind_speed: Option<f64>,
    pub chemical_type: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Request-level constraints overriding pipeline defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Constraints {
    #[serde(default = "Constraints::default_max_response_time_hours")]
    pub max_response_time_hours: f64,
    pub max_teams: Option<u32>,
    #[serde(default = "Constraints::default_n_alternatives")]
    pub n_alternatives: usize,
}

impl Constraints {
    fn default_max_response_time_hours() -> f64 {
        2.0
    }

    fn default_n_alternatives() -> usize {
        5
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_response_time_hours: Self::default_max_response_time_hours(),
            max_teams: None,
            n_alternatives: Self::default_n_alternatives(),
        }
    }
}

/// Per-request override of the five soft-scoring dimension weights.
///
/// Must sum to 1.0 within `1e-6` — enforced by [`crate::evaluation::EvaluationWeights::validate`],
/// not at deserialization time, since a malformed override is a per-request
/// `ConfigError`-shaped condition rather than a parse failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizationWeightsOverride {
    pub success_rate: f64,
    pub response_time: f64,
    pub coverage_rate: f64,
    pub risk: f64,
    pub redundancy: f64,
}

/// The immutable input to a pipeline run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Request {
    pub event_id: String,
    pub scenario_id: String,
    pub disaster_description: String,
    #[serde(default)]
    pub structured_input: StructuredInput,
    #[serde(default)]
    pub constraints: Constraints,
    pub optimization_weights: Option<OptimizationWeightsOverride>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_accepts_lat_lng_form() {
        let v: Location = serde_json::from_value(serde_json::json!({"lat": 31.68, "lng": 103.85}))
            .unwrap();
        assert_eq!(v.latitude, 31.68);
        assert_eq!(v.longitude, 103.85);
    }

    #[test]
    fn location_accepts_latitude_longitude_form() {
        let v: Location =
            serde_json::from_value(serde_json::json!({"latitude": 31.68, "longitude": 103.85}))
                .unwrap();
        assert_eq!(v.latitude, 31.68);
        assert_eq!(v.longitude, 103.85);
    }

    #[test]
    fn distance_km_is_zero_for_identical_points() {
        let a = Location::new(31.68, 103.85);
        assert!(a.distance_km(&a) < 1e-9);
    }

    #[test]
    fn constraints_default_matches_spec() {
        let c = Constraints::default();
        assert_eq!(c.max_response_time_hours, 2.0);
        assert_eq!(c.n_alternatives, 5);
        assert!(c.max_teams.is_none());
    }
}
