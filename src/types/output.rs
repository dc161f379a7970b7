//! Final assembled output record (spec §3 "Output", §6 "Caller surface")

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AllocationSolution, CapabilityRequirement, MatchedRule, ParallelGroup, ParsedDisaster,
    ResourceCandidate, SchemeScore, SimilarCase, TaskSequenceItem, Trace, TriggeredTask,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// The Understanding stage's contribution to the assembled output.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UnderstandingOutput {
    pub parsed_disaster: Option<ParsedDisaster>,
    pub similar_cases: Vec<SimilarCase>,
    pub understanding_summary: String,
}

/// The Reasoning stage's contribution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReasoningOutput {
    pub matched_rules: Vec<MatchedRule>,
    pub capability_requirements: Vec<CapabilityRequirement>,
    pub triggered_tasks: Vec<TriggeredTask>,
}

/// The HTN stage's contribution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HtnOutput {
    pub scene_codes: Vec<String>,
    pub task_sequence: Vec<TaskSequenceItem>,
    pub parallel_tasks: Vec<ParallelGroup>,
}

/// The Matcher stage's contribution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchingOutput {
    pub candidates: Vec<ResourceCandidate>,
    pub candidates_count: usize,
}

/// The Allocator stage's contribution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OptimizationOutput {
    pub solutions: Vec<AllocationSolution>,
    pub algorithm_used: String,
}

/// The record emitted at the end of every pipeline run, success or failure
/// (spec §3 "Output", §6 "Caller surface").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub success: bool,
    pub event_id: String,
    pub scenario_id: String,
    pub status: RunStatus,
    pub understanding: UnderstandingOutput,
    pub reasoning: ReasoningOutput,
    pub htn_decomposition: HtnOutput,
    pub matching: MatchingOutput,
    pub optimization: OptimizationOutput,
    pub scheme_scores: Vec<SchemeScore>,
    pub recommended_scheme: Option<AllocationSolution>,
    pub scheme_explanation: String,
    pub trace: Trace,
    pub errors: Vec<String>,
    pub execution_time_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl Output {
    /// `success = (errors empty AND recommendation present)` (spec §4.7).
    pub fn compute_success(errors: &[String], recommended_scheme: &Option<AllocationSolution>) -> bool {
        errors.is_empty() && recommended_scheme.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_empty_errors_and_recommendation() {
        assert!(!Output::compute_success(&["boom".to_string()], &None));
        assert!(!Output::compute_success(&[], &None));
    }
}
