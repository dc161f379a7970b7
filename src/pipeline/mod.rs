//! Pipeline Orchestrator (spec §4.1)
//!
//! Runs the fixed directed acyclic graph of stages over one [`Request`],
//! threading an owned state record through `understand → enhance_with_cases
//! → query_rules → apply_rules → htn_decompose → match_resources →
//! optimize_allocation → filter_hard_rules → score_soft_rules →
//! explain_scheme → generate_output`, with early `return` on each
//! conditional predicate — a `PipelineCoordinator::process_packet`-style
//! phase chain, threading one state record through each phase with early
//! returns when a phase's guard fails.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::adapters::{KnowledgeGraphAdapter, LlmAdapter, TeamRegistryAdapter, VectorStoreAdapter};
use crate::htn::library::MetaTaskLibrary;
use crate::types::{
    EvaluationWeights, HtnOutput, Location, MatchingOutput, OptimizationOutput, Output,
    OptimizationWeightsOverride, PipelineError, Request, ReasoningOutput, RunStatus, Trace,
    UnderstandingOutput,
};
use crate::{allocation, evaluation, htn, matching, reasoning, understanding};

/// Graph node names, in execution order, exactly as named in spec §8's
/// end-to-end trace fixture. Kept as a literal list rather than derived so
/// the fixed topology is inspectable independent of the `run` body.
const STAGE_UNDERSTAND: &str = "understand_disaster";
const STAGE_ENHANCE: &str = "enhance_with_cases";
const STAGE_QUERY_RULES: &str = "query_rules";
const STAGE_APPLY_RULES: &str = "apply_rules";
const STAGE_HTN: &str = "htn_decompose";
const STAGE_MATCH: &str = "match_resources";
const STAGE_OPTIMIZE: &str = "optimize_allocation";
const STAGE_FILTER_HARD: &str = "filter_hard_rules";
const STAGE_SCORE_SOFT: &str = "score_soft_rules";
const STAGE_EXPLAIN: &str = "explain_scheme";
const STAGE_OUTPUT: &str = "generate_output";

/// Owns the four external collaborators plus the process-start meta-task
/// library, and runs requests against them. Cheap to clone (everything is
/// `Arc`-backed); share one instance across concurrent requests, matching
/// spec §4.1 "Database and LLM client objects are shared across requests
/// and must be safe for concurrent use."
#[derive(Clone)]
pub struct Pipeline {
    llm: Arc<dyn LlmAdapter>,
    vector_store: Arc<dyn VectorStoreAdapter>,
    knowledge_graph: Arc<dyn KnowledgeGraphAdapter>,
    team_registry: Arc<dyn TeamRegistryAdapter>,
    meta_task_library: Arc<MetaTaskLibrary>,
}

impl Pipeline {
    /// Loads the meta-task library once (spec §5 "Shared resources ...
    /// loaded at process start"). A malformed library is a `ConfigError`,
    /// fatal to process start (spec §7).
    pub fn new(
        llm: Arc<dyn LlmAdapter>,
        vector_store: Arc<dyn VectorStoreAdapter>,
        knowledge_graph: Arc<dyn KnowledgeGraphAdapter>,
        team_registry: Arc<dyn TeamRegistryAdapter>,
    ) -> Result<Self, PipelineError> {
        let meta_task_library = Arc::new(MetaTaskLibrary::load()?);
        Ok(Self { llm, vector_store, knowledge_graph, team_registry, meta_task_library })
    }

    /// `Run(Request) -> Output` (spec §4.1 "Contract"). Always produces an
    /// `Output`, measuring wall-clock time from entry to emission.
    pub async fn run(&self, request: &Request) -> Output {
        let started_at = Instant::now();
        let mut trace = Trace::new();
        let mut errors: Vec<String> = vec![];

        let mut understanding_out = UnderstandingOutput::default();
        let mut reasoning_out = ReasoningOutput::default();
        let mut htn_out = HtnOutput::default();
        let mut matching_out = MatchingOutput::default();
        let mut optimization_out = OptimizationOutput::default();
        let mut scheme_scores = vec![];
        let mut recommended_scheme = None;
        let mut scheme_explanation = String::new();

        trace.record_stage(STAGE_UNDERSTAND);
        let understanding_result =
            understanding::run(request, self.llm.as_ref(), self.vector_store.as_ref(), &mut trace).await;
        trace.record_stage(STAGE_ENHANCE);
        understanding_out.similar_cases = understanding_result.similar_cases;
        understanding_out.understanding_summary = understanding_result.understanding_summary;

        let Some(parsed_disaster) = understanding_result.parsed_disaster else {
            if let Some(e) = understanding_result.error {
                debug!(error = %e, "understanding stage failed, short-circuiting to output assembly");
                errors.push(e.to_string());
            }
            return self.assemble(
                request,
                started_at,
                trace,
                errors,
                understanding_out,
                reasoning_out,
                htn_out,
                matching_out,
                optimization_out,
                scheme_scores,
                recommended_scheme,
                scheme_explanation,
            );
        };
        understanding_out.parsed_disaster = Some(parsed_disaster.clone());

        trace.record_stage(STAGE_QUERY_RULES);
        trace.record_stage(STAGE_APPLY_RULES);
        let reasoning_result = reasoning::run(&parsed_disaster, self.knowledge_graph.as_ref(), &mut trace).await;
        reasoning_out.matched_rules = reasoning_result.matched_rules.clone();
        reasoning_out.capability_requirements = reasoning_result.capability_requirements.clone();
        reasoning_out.triggered_tasks = reasoning_result.triggered_tasks.clone();

        if reasoning_result.matched_rules.is_empty() {
            debug!("no rule matched, short-circuiting to output assembly");
            trace.note("short_circuit_stage", STAGE_APPLY_RULES);
            return self.assemble(
                request,
                started_at,
                trace,
                errors,
                understanding_out,
                reasoning_out,
                htn_out,
                matching_out,
                optimization_out,
                scheme_scores,
                recommended_scheme,
                scheme_explanation,
            );
        }

        trace.record_stage(STAGE_HTN);
        htn_out.scene_codes = reasoning_result.scene_codes.clone();
        let decomposition = match htn::decompose(&reasoning_result.scene_codes, &self.meta_task_library) {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "HTN decomposition failed, short-circuiting to output assembly");
                errors.push(e.to_string());
                return self.assemble(
                    request,
                    started_at,
                    trace,
                    errors,
                    understanding_out,
                    reasoning_out,
                    htn_out,
                    matching_out,
                    optimization_out,
                    scheme_scores,
                    recommended_scheme,
                    scheme_explanation,
                );
            }
        };
        htn_out.task_sequence = decomposition.task_sequence;
        htn_out.parallel_tasks = decomposition.parallel_tasks;

        if htn_out.task_sequence.is_empty() {
            debug!("empty task sequence, short-circuiting to output assembly");
            trace.note("short_circuit_stage", STAGE_HTN);
            return self.assemble(
                request,
                started_at,
                trace,
                errors,
                understanding_out,
                reasoning_out,
                htn_out,
                matching_out,
                optimization_out,
                scheme_scores,
                recommended_scheme,
                scheme_explanation,
            );
        }

        trace.record_stage(STAGE_MATCH);
        let required_capabilities: HashSet<String> =
            reasoning_out.capability_requirements.iter().map(|r| r.capability.clone()).collect();
        let event_location = parsed_disaster.location.unwrap_or_else(|| {
            debug!("no event location in request, defaulting to (0.0, 0.0)");
            Location::new(0.0, 0.0)
        });

        let match_result = match matching::run(
            event_location,
            &parsed_disaster,
            request.constraints.max_response_time_hours,
            request.constraints.max_teams,
            &required_capabilities,
            self.team_registry.as_ref(),
            &mut trace,
        )
        .await
        {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "matcher failed, short-circuiting to output assembly");
                errors.push(e.to_string());
                return self.assemble(
                    request,
                    started_at,
                    trace,
                    errors,
                    understanding_out,
                    reasoning_out,
                    htn_out,
                    matching_out,
                    optimization_out,
                    scheme_scores,
                    recommended_scheme,
                    scheme_explanation,
                );
            }
        };
        matching_out.candidates_count = match_result.candidates.len();
        matching_out.candidates = match_result.candidates;

        trace.record_stage(STAGE_OPTIMIZE);
        let allocation_result = match allocation::run(
            &matching_out.candidates,
            &required_capabilities,
            request.constraints.n_alternatives,
            &mut trace,
        ) {
            Ok(a) => a,
            Err(e) => {
                debug!(error = %e, "allocator produced no solutions, short-circuiting to output assembly");
                errors.push(e.to_string());
                return self.assemble(
                    request,
                    started_at,
                    trace,
                    errors,
                    understanding_out,
                    reasoning_out,
                    htn_out,
                    matching_out,
                    optimization_out,
                    scheme_scores,
                    recommended_scheme,
                    scheme_explanation,
                );
            }
        };
        optimization_out.algorithm_used = allocation_result.algorithm_used;
        optimization_out.solutions = allocation_result.solutions;

        trace.record_stage(STAGE_FILTER_HARD);
        trace.record_stage(STAGE_SCORE_SOFT);
        trace.record_stage(STAGE_EXPLAIN);
        let weights_override = request.optimization_weights.as_ref().map(from_override);
        let evaluation_result = evaluation::run(
            &optimization_out.solutions,
            &matching_out.candidates,
            &required_capabilities,
            &parsed_disaster,
            &understanding_out.similar_cases,
            weights_override,
            &htn_out.task_sequence,
            self.llm.as_ref(),
            &mut trace,
        )
        .await;

        scheme_scores = evaluation_result.scheme_scores;
        recommended_scheme = evaluation_result.recommended_solution;
        scheme_explanation = evaluation_result.scheme_explanation;

        self.assemble(
            request,
            started_at,
            trace,
            errors,
            understanding_out,
            reasoning_out,
            htn_out,
            matching_out,
            optimization_out,
            scheme_scores,
            recommended_scheme,
            scheme_explanation,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        request: &Request,
        started_at: Instant,
        mut trace: Trace,
        errors: Vec<String>,
        understanding: UnderstandingOutput,
        reasoning: ReasoningOutput,
        htn_decomposition: HtnOutput,
        matching: MatchingOutput,
        optimization: OptimizationOutput,
        scheme_scores: Vec<crate::types::SchemeScore>,
        recommended_scheme: Option<crate::types::AllocationSolution>,
        scheme_explanation: String,
    ) -> Output {
        trace.record_stage(STAGE_OUTPUT);
        let success = Output::compute_success(&errors, &recommended_scheme);
        let status = if success { RunStatus::Completed } else { RunStatus::Failed };
        let execution_time_ms = started_at.elapsed().as_millis() as u64;

        debug!(
            event_id = %request.event_id,
            success,
            execution_time_ms,
            "pipeline run complete"
        );

        Output {
            success,
            event_id: request.event_id.clone(),
            scenario_id: request.scenario_id.clone(),
            status,
            understanding,
            reasoning,
            htn_decomposition,
            matching,
            optimization,
            scheme_scores,
            recommended_scheme,
            scheme_explanation,
            trace,
            errors,
            execution_time_ms,
            completed_at: chrono::Utc::now(),
        }
    }
}

fn from_override(o: &OptimizationWeightsOverride) -> EvaluationWeights {
    EvaluationWeights {
        success_rate: o.success_rate,
        response_time: o.response_time,
        coverage_rate: o.coverage_rate,
        risk: o.risk,
        redundancy: o.redundancy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::knowledge_graph::fakes::StaticKnowledgeGraph;
    use crate::adapters::knowledge_graph::{
        ConditionOp, RawRequiredCapability, RawRuleRecord, RawTriggeredTask, TriggerCondition, TriggerLogic,
    };
    use crate::adapters::llm::fakes::{FailingLlmAdapter, StaticLlmAdapter};
    use crate::adapters::llm::LlmParsedDisaster;
    use crate::adapters::team_registry::fakes::StaticTeamRegistry;
    use crate::adapters::vector_store::fakes::{FailingVectorStore, StaticVectorStore};
    use crate::adapters::Team;
    use crate::config::{self, PipelineConfig};
    use crate::types::{Constraints, StructuredInput};

    fn ensure_config() {
        if !config::is_initialized() {
            config::init(PipelineConfig::default());
        }
    }

    fn earthquake_rule() -> RawRuleRecord {
        RawRuleRecord {
            rule_id: "R1".to_string(),
            rule_name: "Building collapse search".to_string(),
            disaster_type: "earthquake".to_string(),
            priority: "critical".to_string(),
            weight: 1.0,
            trigger_conditions: vec![TriggerCondition {
                field: "has_infrastructure_collapse".to_string(),
                op: ConditionOp::Eq,
                literal: serde_json::json!(true),
            }],
            trigger_logic: TriggerLogic::And,
            triggered_tasks: vec![RawTriggeredTask {
                task_code: "SEARCH_RESCUE".to_string(),
                task_name: "Search and rescue".to_string(),
                priority: "critical".to_string(),
                sequence: 1,
            }],
            required_capabilities: vec![
                RawRequiredCapability {
                    capability_code: "LIFE_DETECTION".to_string(),
                    capability_name: "Life detection".to_string(),
                },
                RawRequiredCapability {
                    capability_code: "STRUCTURAL_RESCUE".to_string(),
                    capability_name: "Structural rescue".to_string(),
                },
            ],
            scene_code: "building-collapse-search".to_string(),
        }
    }

    fn team(id: &str, lat_offset: f64, caps: Vec<&str>) -> Team {
        Team {
            id: id.to_string(),
            name: format!("Team {id}"),
            team_type: "search_rescue".to_string(),
            base_location: Location::new(31.68 + lat_offset, 103.85),
            base_address: "addr".to_string(),
            total_personnel: 10,
            available_personnel: 10,
            capability_level: 4,
            response_time_minutes: None,
            status: "standby".to_string(),
            capabilities: caps.into_iter().map(String::from).collect(),
            distance_km: 0.0,
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

    fn request() -> Request {
        Request {
            event_id: "evt-1".to_string(),
            scenario_id: "scn-1".to_string(),
            disaster_description: "M6.5 earthquake, building collapse, ~200 trapped".to_string(),
            structured_input: StructuredInput {
                location: Some(Location::new(31.68, 103.85)),
                magnitude: Some(6.5),
                depth_km: Some(10.0),
                ..Default::default()
            },
            constraints: Constraints::default(),
            optimization_weights: None,
        }
    }

    fn pipeline_with(
        llm: Arc<dyn LlmAdapter>,
        vector_store: Arc<dyn VectorStoreAdapter>,
        kg: Arc<dyn KnowledgeGraphAdapter>,
        registry: Arc<dyn TeamRegistryAdapter>,
    ) -> Pipeline {
        Pipeline::new(llm, vector_store, kg, registry).unwrap()
    }

    #[tokio::test]
    async fn nominal_earthquake_run_produces_recommendation() {
        ensure_config();
        let llm = Arc::new(StaticLlmAdapter::new(llm_parse()));
        let vs = Arc::new(StaticVectorStore::empty());
        let kg = Arc::new(StaticKnowledgeGraph::new(vec![earthquake_rule()], vec![]));
        let teams: Vec<Team> = (0..30)
            .map(|i| {
                team(
                    &format!("t{i}"),
                    (i as f64) * 0.02,
                    vec!["LIFE_DETECTION", "STRUCTURAL_RESCUE", "MEDICAL_TRIAGE"],
                )
            })
            .collect();
        let registry = Arc::new(StaticTeamRegistry::new(teams));
        let pipeline = pipeline_with(llm, vs, kg, registry);

        let output = pipeline.run(&request()).await;

        assert!(output.success);
        assert!(output.recommended_scheme.is_some());
        assert_eq!(
            output.trace.phases_executed,
            vec![
                "understand_disaster",
                "enhance_with_cases",
                "query_rules",
                "apply_rules",
                "htn_decompose",
                "match_resources",
                "optimize_allocation",
                "filter_hard_rules",
                "score_soft_rules",
                "explain_scheme",
                "generate_output",
            ]
        );
    }

    #[tokio::test]
    async fn rag_failure_still_succeeds() {
        ensure_config();
        let llm = Arc::new(StaticLlmAdapter::new(llm_parse()));
        let vs = Arc::new(FailingVectorStore);
        let kg = Arc::new(StaticKnowledgeGraph::new(vec![earthquake_rule()], vec![]));
        let teams: Vec<Team> = (0..5)
            .map(|i| team(&format!("t{i}"), (i as f64) * 0.02, vec!["LIFE_DETECTION", "STRUCTURAL_RESCUE"]))
            .collect();
        let registry = Arc::new(StaticTeamRegistry::new(teams));
        let pipeline = pipeline_with(llm, vs, kg, registry);

        let output = pipeline.run(&request()).await;

        assert!(output.understanding.similar_cases.is_empty());
        assert!(!output.understanding.understanding_summary.is_empty());
        assert!(output.trace.rag_calls >= 1);
    }

    #[tokio::test]
    async fn llm_parse_failure_short_circuits_with_error() {
        ensure_config();
        let llm = Arc::new(FailingLlmAdapter);
        let vs = Arc::new(StaticVectorStore::empty());
        let kg = Arc::new(StaticKnowledgeGraph::empty());
        let registry = Arc::new(StaticTeamRegistry::new(vec![]));
        let pipeline = pipeline_with(llm, vs, kg, registry);

        let output = pipeline.run(&request()).await;

        assert!(!output.success);
        assert!(!output.errors.is_empty());
        assert!(output.recommended_scheme.is_none());
        assert_eq!(output.trace.phases_executed.last().unwrap(), STAGE_OUTPUT);
    }

    #[tokio::test]
    async fn no_candidate_teams_short_circuits_to_output() {
        ensure_config();
        let llm = Arc::new(StaticLlmAdapter::new(llm_parse()));
        let vs = Arc::new(StaticVectorStore::empty());
        let kg = Arc::new(StaticKnowledgeGraph::new(vec![earthquake_rule()], vec![]));
        let registry = Arc::new(StaticTeamRegistry::new(vec![]));
        let pipeline = pipeline_with(llm, vs, kg, registry);

        let output = pipeline.run(&request()).await;

        assert!(!output.success);
        assert!(output.errors.iter().any(|e| e.contains("no candidate teams")));
        assert!(!output.trace.phases_executed.contains(&STAGE_OPTIMIZE.to_string()));
    }
}
