//! Disaster Understanding stage (spec §4.2)
//!
//! Dispatches the LLM parse and RAG search concurrently
//! (`tokio::join!`, grounded on `examples/original_source/.../nodes/understanding.py`'s
//! `asyncio.gather`), then runs a synchronous physics-calibration pass when
//! the parse succeeded and the disaster type has a closed-form assessor.

pub mod physics;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::adapters::{LlmAdapter, VectorStoreAdapter};
use crate::config::defaults::{LLM_TIMEOUT_SECS, RAG_DEFAULT_TOP_K, VECTOR_STORE_TIMEOUT_SECS};
use crate::types::{
    BuildingDamageLevel, DisasterType, Location, ParsedDisaster, PipelineError, Request, Severity,
    SimilarCase, Trace,
};

/// Result of the Understanding stage: a partial state update plus, on
/// fatal failure, the captured error (spec §4.1 "stage that raises an
/// unrecoverable error").
pub struct UnderstandingResult {
    pub parsed_disaster: Option<ParsedDisaster>,
    pub similar_cases: Vec<SimilarCase>,
    pub understanding_summary: String,
    pub error: Option<PipelineError>,
}

/// Normalizes `structured_input.location` to `Option<Location>` whichever
/// key convention (`latitude/longitude` vs `lat/lng`) was used — handled
/// transparently by [`Location`]'s `Deserialize` impl, so this is a
/// pass-through (spec §9 "Open questions").
fn location_hint(request: &Request) -> Option<Location> {
    request.structured_input.location
}

fn parse_severity(raw: &str) -> Severity {
    Severity::from_str_loose(raw)
}

fn parse_disaster_type(raw: &str) -> DisasterType {
    match raw.to_lowercase().as_str() {
        "earthquake" => DisasterType::Earthquake,
        "flood" => DisasterType::Flood,
        "hazmat" => DisasterType::Hazmat,
        "fire" => DisasterType::Other("fire".to_string()),
        "landslide" => DisasterType::Other("landslide".to_string()),
        other if !other.is_empty() => DisasterType::Other(other.to_string()),
        _ => DisasterType::Other("unknown".to_string()),
    }
}

fn parse_building_damage(raw: Option<&str>) -> BuildingDamageLevel {
    match raw.map(str::to_lowercase).as_deref() {
        Some("none") => BuildingDamageLevel::None,
        Some("partial") => BuildingDamageLevel::Partial,
        Some("severe") => BuildingDamageLevel::Severe,
        Some("collapsed") => BuildingDamageLevel::Collapsed,
        _ => BuildingDamageLevel::Unknown,
    }
}

/// Runs the Understanding stage: concurrent LLM parse + RAG search,
/// followed by physics calibration when applicable.
pub async fn run(
    request: &Request,
    llm: &dyn LlmAdapter,
    vector_store: &dyn VectorStoreAdapter,
    trace: &mut Trace,
) -> UnderstandingResult {
    let context = serde_json::json!({
        "structured_input": request.structured_input,
    });
    let disaster_type_hint = request
        .structured_input
        .disaster_type
        .clone()
        .unwrap_or_else(|| "earthquake".to_string());

    let parse_fut = tokio::time::timeout(
        std::time::Duration::from_secs(LLM_TIMEOUT_SECS),
        llm.parse_disaster(&request.disaster_description, &context),
    );
    let rag_fut = tokio::time::timeout(
        std::time::Duration::from_secs(VECTOR_STORE_TIMEOUT_SECS),
        vector_store.search_similar_cases(&request.disaster_description, &disaster_type_hint, RAG_DEFAULT_TOP_K),
    );

    let (parse_result, rag_result) = tokio::join!(parse_fut, rag_fut);
    trace.llm_calls += 1;
    trace.rag_calls += 1;

    let similar_cases = match rag_result {
        Ok(Ok(cases)) => cases,
        Ok(Err(e)) => {
            warn!(error = %e, "RAG search failed, continuing with no similar cases");
            vec![]
        }
        Err(_) => {
            warn!("RAG search timed out, continuing with no similar cases");
            vec![]
        }
    };

    let llm_parsed = match parse_result {
        Ok(Ok(parsed)) => parsed,
        Ok(Err(e)) => {
            return UnderstandingResult {
                parsed_disaster: None,
                similar_cases,
                understanding_summary: String::new(),
                error: Some(e),
            };
        }
        Err(_) => {
            return UnderstandingResult {
                parsed_disaster: None,
                similar_cases,
                understanding_summary: String::new(),
                error: Some(PipelineError::ParseError("LLM parse timed out".to_string())),
            };
        }
    };

    let mut additional_info: HashMap<String, serde_json::Value> = HashMap::new();
    let mut parsed = ParsedDisaster {
        disaster_type: parse_disaster_type(&llm_parsed.disaster_type),
        severity: parse_severity(&llm_parsed.severity),
        magnitude: llm_parsed.magnitude.or(request.structured_input.magnitude),
        depth_km: llm_parsed.depth_km.or(request.structured_input.depth_km),
        location: location_hint(request),
        affected_area_km2: llm_parsed.affected_area_km2,
        disaster_level: None,
        building_damage_level: parse_building_damage(llm_parsed.building_damage_level.as_deref()),
        has_trapped_people: llm_parsed.has_trapped_people,
        has_hazmat_release: llm_parsed.has_hazmat_release,
        has_infrastructure_collapse: llm_parsed.has_infrastructure_collapse,
        has_fire: llm_parsed.has_fire,
        estimated_trapped: llm_parsed.estimated_trapped,
        affected_population: llm_parsed.affected_population,
        additional_info: HashMap::new(),
    };

    calibrate_with_physics(&mut parsed, request, &mut additional_info);
    parsed.additional_info = additional_info;

    let summary = format!(
        "{:?} disaster, severity {:?}, {} trapped estimated",
        parsed.disaster_type,
        parsed.severity,
        parsed.estimated_trapped.unwrap_or(0)
    );

    debug!(disaster_type = ?parsed.disaster_type, calibrated = parsed.was_physics_calibrated(), "understanding stage complete");

    UnderstandingResult {
        parsed_disaster: Some(parsed),
        similar_cases,
        understanding_summary: summary,
        error: None,
    }
}

/// Dispatches on `disaster_type` to a closed-form assessor and overwrites
/// the relevant `ParsedDisaster` fields in place (spec §4.2).
fn calibrate_with_physics(
    parsed: &mut ParsedDisaster,
    request: &Request,
    additional_info: &mut HashMap<String, serde_json::Value>,
) {
    match &parsed.disaster_type {
        DisasterType::Earthquake => {
            let (Some(magnitude), Some(depth_km)) = (parsed.magnitude, parsed.depth_km.or(Some(10.0))) else {
                return;
            };
            let assessment = physics::assess_earthquake(magnitude, depth_km, None);
            apply_assessment(
                parsed,
                additional_info,
                assessment.affected_area_km2,
                assessment.affected_population,
                assessment.disaster_level,
                assessment.casualties,
            );
        }
        DisasterType::Flood => {
            let Some(rainfall_mm) = request.structured_input.rainfall_mm else {
                return;
            };
            let assessment = physics::assess_flood(rainfall_mm, parsed.affected_area_km2, None);
            apply_assessment(
                parsed,
                additional_info,
                assessment.affected_area_km2,
                assessment.affected_population,
                assessment.disaster_level,
                assessment.casualties,
            );
        }
        DisasterType::Hazmat => {
            let Some(wind_speed) = request.structured_input.wind_speed else {
                return;
            };
            let chemical_type = request
                .structured_input
                .chemical_type
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            let leak_rate_kg_s = request
                .structured_input
                .extra
                .get("leak_rate_kg_s")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(10.0);
            let stability_class = request
                .structured_input
                .extra
                .get("stability_class")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("D")
                .to_string();
            let assessment =
                physics::assess_hazmat(&chemical_type, leak_rate_kg_s, wind_speed, &stability_class, None);
            apply_assessment(
                parsed,
                additional_info,
                assessment.affected_area_km2,
                assessment.affected_population,
                assessment.disaster_level,
                assessment.casualties,
            );
        }
        DisasterType::Other(_) => {}
    }
}

fn apply_assessment(
    parsed: &mut ParsedDisaster,
    additional_info: &mut HashMap<String, serde_json::Value>,
    affected_area_km2: f64,
    affected_population: f64,
    disaster_level: crate::types::DisasterLevel,
    casualties: crate::types::CasualtyEstimate,
) {
    parsed.affected_area_km2 = Some(affected_area_km2);
    parsed.affected_population = Some(affected_population);
    parsed.disaster_level = Some(disaster_level);
    additional_info.insert("physics_model_calibrated".to_string(), serde_json::Value::Bool(true));
    additional_info.insert(
        "estimated_casualties".to_string(),
        serde_json::json!({
            "deaths": casualties.deaths,
            "injuries": casualties.injuries,
            "missing": casualties.missing,
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::fakes::{FailingLlmAdapter, StaticLlmAdapter};
    use crate::adapters::llm::LlmParsedDisaster;
    use crate::adapters::vector_store::fakes::{FailingVectorStore, StaticVectorStore};
    use crate::types::{Constraints, StructuredInput};

    fn request() -> Request {
        Request {
            event_id: "evt-1".to_string(),
            scenario_id: "scn-1".to_string(),
            disaster_description: "M6.5 earthquake, building collapse, ~200 trapped".to_string(),
            structured_input: StructuredInput {
                magnitude: Some(6.5),
                depth_km: Some(10.0),
                ..Default::default()
            },
            constraints: Constraints::default(),
            optimization_weights: None,
        }
    }

    fn llm_parse() -> LlmParsedDisaster {
        LlmParsedDisaster {
            disaster_type: "earthquake".to_string(),
            severity: "critical".to_string(),
            magnitude: Some(6.5),
            depth_km: Some(10.0),
            affected_area_km2: None,
            building_damage_level: Some("collapsed".to_string()),
            has_trapped_people: true,
            has_hazmat_release: false,
            has_infrastructure_collapse: true,
            has_fire: false,
            estimated_trapped: Some(200),
            affected_population: Some(15000.0),
        }
    }

    #[tokio::test]
    async fn nominal_parse_calibrates_with_physics() {
        let llm = StaticLlmAdapter::new(llm_parse());
        let vs = StaticVectorStore::empty();
        let mut trace = Trace::new();
        let result = run(&request(), &llm, &vs, &mut trace).await;
        let parsed = result.parsed_disaster.expect("parse should succeed");
        assert!(parsed.was_physics_calibrated());
        assert_eq!(trace.llm_calls, 1);
        assert_eq!(trace.rag_calls, 1);
    }

    #[tokio::test]
    async fn rag_failure_is_non_fatal() {
        let llm = StaticLlmAdapter::new(llm_parse());
        let vs = FailingVectorStore;
        let mut trace = Trace::new();
        let result = run(&request(), &llm, &vs, &mut trace).await;
        assert!(result.error.is_none());
        assert!(result.similar_cases.is_empty());
        assert!(result.parsed_disaster.is_some());
    }

    #[tokio::test]
    async fn llm_failure_is_fatal() {
        let llm = FailingLlmAdapter;
        let vs = StaticVectorStore::empty();
        let mut trace = Trace::new();
        let result = run(&request(), &llm, &vs, &mut trace).await;
        assert!(result.parsed_disaster.is_none());
        assert!(result.error.is_some());
    }
}
