//! LLM adapter (spec §6 "LLM adapter")

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{AllocationSolution, ParsedDisaster, PipelineError, TaskSequenceItem};

/// Raw structured parse the LLM returns for `ParseDisaster`. Field names
/// follow a loose-enum-from-string idiom: unknown enum values are *not*
/// rejected here, they're clamped to `unknown`/`medium` by the
/// Understanding stage that calls this adapter (spec §4.2).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmParsedDisaster {
    pub disaster_type: String,
    pub severity: String,
    pub magnitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub affected_area_km2: Option<f64>,
    pub building_damage_level: Option<String>,
    pub has_trapped_people: bool,
    pub has_hazmat_release: bool,
    pub has_infrastructure_collapse: bool,
    pub has_fire: bool,
    pub estimated_trapped: Option<u32>,
    pub affected_population: Option<f64>,
}

/// Structured explanation returned by `ExplainScheme` (spec §4.6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemeExplanation {
    pub summary: String,
    pub situation_assessment: String,
    pub selection_reason: String,
    pub key_advantages: Vec<String>,
    pub resource_deployment: Vec<String>,
    pub timeline: Vec<String>,
    pub coordination_points: Vec<String>,
    pub potential_risks: Vec<String>,
    pub mitigation_measures: Vec<String>,
    pub execution_suggestions: Vec<String>,
    pub commander_notes: String,
}

/// `ParseDisaster` / `ExplainScheme` adapter contract (spec §6). Both calls
/// must be cancellable; the core wraps them in `tokio::time::timeout`
/// using [`crate::config::defaults::LLM_TIMEOUT_SECS`] (spec §5).
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn parse_disaster(
        &self,
        description: &str,
        context: &serde_json::Value,
    ) -> Result<LlmParsedDisaster, PipelineError>;

    async fn explain_scheme(
        &self,
        solution: &AllocationSolution,
        disaster: &ParsedDisaster,
        alternatives: &[AllocationSolution],
        task_sequence: &[TaskSequenceItem],
    ) -> Result<SchemeExplanation, PipelineError>;
}

pub mod fakes {
    use super::*;

    /// Returns a canned, deterministic parse/explanation — the fixture LLM
    /// used across the crate's end-to-end tests (spec §8 "each scenario
    /// uses a fixture LLM/KG/DB").
    pub struct StaticLlmAdapter {
        pub parsed: LlmParsedDisaster,
    }

    impl StaticLlmAdapter {
        pub fn new(parsed: LlmParsedDisaster) -> Self {
            Self { parsed }
        }
    }

    #[async_trait]
    impl LlmAdapter for StaticLlmAdapter {
        async fn parse_disaster(
            &self,
            _description: &str,
            _context: &serde_json::Value,
        ) -> Result<LlmParsedDisaster, PipelineError> {
            Ok(self.parsed.clone())
        }

        async fn explain_scheme(
            &self,
            solution: &AllocationSolution,
            _disaster: &ParsedDisaster,
            _alternatives: &[AllocationSolution],
            _task_sequence: &[TaskSequenceItem],
        ) -> Result<SchemeExplanation, PipelineError> {
            Ok(SchemeExplanation {
                summary: format!("Deployed {} teams", solution.teams_count),
                situation_assessment: "Fixture assessment".to_string(),
                selection_reason: "Fixture selection reason".to_string(),
                key_advantages: vec!["Fast response".to_string()],
                resource_deployment: vec![],
                timeline: vec![],
                coordination_points: vec![],
                potential_risks: vec![],
                mitigation_measures: vec![],
                execution_suggestions: vec![],
                commander_notes: "Fixture notes".to_string(),
            })
        }
    }

    /// Always fails, for exercising the stage's error-handling paths.
    pub struct FailingLlmAdapter;

    #[async_trait]
    impl LlmAdapter for FailingLlmAdapter {
        async fn parse_disaster(
            &self,
            _description: &str,
            _context: &serde_json::Value,
        ) -> Result<LlmParsedDisaster, PipelineError> {
            Err(PipelineError::ParseError("fixture failure".to_string()))
        }

        async fn explain_scheme(
            &self,
            _solution: &AllocationSolution,
            _disaster: &ParsedDisaster,
            _alternatives: &[AllocationSolution],
            _task_sequence: &[TaskSequenceItem],
        ) -> Result<SchemeExplanation, PipelineError> {
            Err(PipelineError::ParseError("fixture failure".to_string()))
        }
    }
}
