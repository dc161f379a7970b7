//! Disaster Understanding stage output types (spec §3, §4.2)

use crate::types::Location;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Building damage level, used by several rule trigger conditions and the
/// built-in fallback rules (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingDamageLevel {
    None,
    Partial,
    Severe,
    Collapsed,
    Unknown,
}

impl Default for BuildingDamageLevel {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Coarse severity bucket assigned during LLM parsing, independent of the
/// later physics-calibrated `disaster_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Loose keyword match over LLM free-text severity labels, matching the
    /// teacher's `Severity::from_str_loose` idiom for noisy model output.
    pub fn from_str_loose(s: &str) -> Self {
        let lower = s.to_lowercase();
        if lower.contains("critical") || lower.contains("catastroph") || lower.contains("severe") {
            Severity::Critical
        } else if lower.contains("high") || lower.contains("major") {
            Severity::High
        } else if lower.contains("moderate") || lower.contains("medium") {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }
}

/// Physics-calibrated disaster level (I = most severe .. IV = least), set by
/// the understanding stage's assessor dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisasterLevel {
    I,
    II,
    III,
    Iv,
}

/// The disaster-type discriminant driving assessor dispatch (§4.2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    Earthquake,
    Flood,
    Hazmat,
    Other(String),
}

/// Casualty estimate broken out by category, surfaced via
/// `ParsedDisaster.additional_info` after physics calibration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct CasualtyEstimate {
    pub deaths: f64,
    pub injuries: f64,
    pub missing: f64,
}

/// The disaster record produced by the Understanding stage: the LLM's
/// structured parse, optionally overwritten in place by a physics assessor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParsedDisaster {
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub location: Option<Location>,
    pub affected_area_km2: Option<f64>,
    pub disaster_level: Option<DisasterLevel>,
    pub building_damage_level: BuildingDamageLevel,
    pub has_trapped_people: bool,
    pub has_hazmat_release: bool,
    pub has_infrastructure_collapse: bool,
    pub has_fire: bool,
    pub estimated_trapped: Option<u32>,
    pub affected_population: Option<f64>,
    pub additional_info: HashMap<String, serde_json::Value>,
}

impl ParsedDisaster {
    /// Builds the `serde_json::Value` field snapshot the trigger-condition
    /// DSL evaluates against (the "TRR condition snapshot", GLOSSARY).
    pub fn condition_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "disaster_type": match &self.disaster_type {
                DisasterType::Earthquake => "earthquake",
                DisasterType::Flood => "flood",
                DisasterType::Hazmat => "hazmat",
                DisasterType::Other(s) => s.as_str(),
            },
            "severity": format!("{:?}", self.severity).to_lowercase(),
            "magnitude": self.magnitude,
            "depth_km": self.depth_km,
            "affected_area_km2": self.affected_area_km2,
            "disaster_level": self.disaster_level.map(|l| format!("{:?}", l).to_uppercase()),
            "building_damage_level": format!("{:?}", self.building_damage_level).to_lowercase(),
            "has_trapped_people": self.has_trapped_people,
            "has_hazmat_release": self.has_hazmat_release,
            "has_infrastructure_collapse": self.has_infrastructure_collapse,
            "has_fire": self.has_fire,
            "estimated_trapped": self.estimated_trapped,
            "affected_population": self.affected_population,
        })
    }

    pub fn was_physics_calibrated(&self) -> bool {
        self.additional_info
            .get("physics_model_calibrated")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// A historical case retrieved by the RAG adapter during understanding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimilarCase {
    pub case_id: String,
    pub summary: String,
    pub relevance_score: f64,
}
