//! Rule Evaluator & Explainer stage (spec §4.6)
//!
//! Filters allocation solutions through hard (veto) rules, scores survivors
//! on five normalized dimensions, selects a recommendation (falling back to
//! catastrophe-mode combination when nothing passes), and assembles a
//! Markdown explanation via the LLM adapter.

mod explain;

use std::collections::HashSet;

use tracing::{info, warn};

use crate::adapters::LlmAdapter;
use crate::config::defaults::{
    REINFORCEMENT_NATIONAL_THRESHOLD, REINFORCEMENT_PROVINCIAL_THRESHOLD, RESPONSE_TIME_GOLDEN_WINDOW_MIN,
    SUCCESS_RATE_CASE_BOOST_SCALE,
};
use crate::types::{
    AllocationSolution, EvaluationWeights, ParsedDisaster, ReinforcementLevel, ResourceAssignment,
    ResourceCandidate, SchemeScore, SimilarCase, SoftScores, TaskSequenceItem, Trace,
};

pub struct EvaluationResult {
    pub scheme_scores: Vec<SchemeScore>,
    pub recommended_solution: Option<AllocationSolution>,
    pub scheme_explanation: String,
    pub catastrophe_mode: bool,
}

/// Runs the Rule Evaluator & Explainer stage (spec §4.6).
pub async fn run(
    solutions: &[AllocationSolution],
    candidates: &[ResourceCandidate],
    required: &HashSet<String>,
    disaster: &ParsedDisaster,
    similar_cases: &[SimilarCase],
    weights_override: Option<EvaluationWeights>,
    task_sequence: &[TaskSequenceItem],
    llm: &dyn LlmAdapter,
    trace: &mut Trace,
) -> EvaluationResult {
    let weights = resolve_weights(disaster, weights_override);

    let hard_rules = &crate::config::get().hard_rules;
    let mut scheme_scores: Vec<SchemeScore> = solutions
        .iter()
        .map(|solution| score_solution(solution, candidates, disaster, similar_cases, &weights, hard_rules, false))
        .collect();

    assign_ranks(&mut scheme_scores);

    let passing_index = scheme_scores.iter().position(|s| s.hard_rule_passed && s.rank == 1);

    let (recommended_solution, catastrophe_mode) = if let Some(idx) = passing_index {
        (Some(solutions[idx].clone()), false)
    } else {
        warn!("no allocation solution passed hard rules, engaging catastrophe mode");
        trace.note_bool("catastrophe_mode", true);
        match combine_for_catastrophe(solutions, candidates, required, disaster, similar_cases, &weights, hard_rules) {
            Some((combined, mut score)) => {
                score.rank = 1;
                scheme_scores.push(score);
                (Some(combined), true)
            }
            None => (None, true),
        }
    };

    let scheme_explanation = match &recommended_solution {
        Some(solution) => {
            let alternatives: Vec<AllocationSolution> = solutions
                .iter()
                .filter(|s| s.solution_id != solution.solution_id)
                .take(3)
                .cloned()
                .collect();
            explain::assemble(solution, disaster, &alternatives, task_sequence, llm, trace).await
        }
        None => {
            trace.note("scheme_explanation_skipped", "no recommendation to explain");
            String::new()
        }
    };

    info!(
        solutions = scheme_scores.len(),
        recommended = recommended_solution.is_some(),
        catastrophe_mode,
        "evaluation complete"
    );

    EvaluationResult { scheme_scores, recommended_solution, scheme_explanation, catastrophe_mode }
}

fn resolve_weights(disaster: &ParsedDisaster, weights_override: Option<EvaluationWeights>) -> EvaluationWeights {
    if let Some(w) = weights_override {
        if w.validate().is_ok() {
            return w;
        }
        warn!("per-request weight override failed to sum to 1.0, falling back to configured weights");
    }
    crate::config::get().weights_for(&disaster_type_key(disaster))
}

fn disaster_type_key(disaster: &ParsedDisaster) -> String {
    match &disaster.disaster_type {
        crate::types::DisasterType::Earthquake => "earthquake".to_string(),
        crate::types::DisasterType::Flood => "flood".to_string(),
        crate::types::DisasterType::Hazmat => "hazmat".to_string(),
        crate::types::DisasterType::Other(s) => s.clone(),
    }
}

fn score_solution(
    solution: &AllocationSolution,
    candidates: &[ResourceCandidate],
    disaster: &ParsedDisaster,
    similar_cases: &[SimilarCase],
    weights: &EvaluationWeights,
    hard_rules: &[crate::config::HardRule],
    catastrophe_mode: bool,
) -> SchemeScore {
    let violations: Vec<String> =
        hard_rules.iter().filter_map(|rule| rule.check(solution, disaster).err()).collect();
    let hard_rule_passed = violations.is_empty();

    let soft = compute_soft_scores(solution, candidates, similar_cases);
    let weighted_score = soft.weighted_sum(weights);

    let (capacity_gap, reinforcement_level, capacity_warning) = if catastrophe_mode {
        let gap = capacity_gap(solution, candidates, disaster);
        let level = reinforcement_level(solution.coverage_rate);
        let warning = format!(
            "rescue capacity shortfall of {gap} person(s): {} standby team(s) cannot reach the estimated \
             trapped population, requesting {level:?} reinforcement",
            solution.teams_count
        );
        (Some(gap), Some(level), warning)
    } else {
        (None, None, String::new())
    };

    SchemeScore {
        scheme_id: solution.solution_id.clone(),
        hard_rule_passed,
        hard_rule_violations: violations,
        soft_rule_scores: soft,
        weighted_score,
        rank: 0,
        catastrophe_mode,
        capacity_gap,
        reinforcement_level,
        requires_reinforcement: catastrophe_mode,
        capacity_warning,
    }
}

fn compute_soft_scores(
    solution: &AllocationSolution,
    candidates: &[ResourceCandidate],
    similar_cases: &[SimilarCase],
) -> SoftScores {
    let mean_match_score = if solution.assignments.is_empty() {
        0.0
    } else {
        solution.assignments.iter().map(|a| a.match_score).sum::<f64>() / solution.assignments.len() as f64
    };
    let success_rate = if similar_cases.is_empty() {
        mean_match_score
    } else {
        let mean_similarity =
            similar_cases.iter().map(|c| c.relevance_score).sum::<f64>() / similar_cases.len() as f64;
        (mean_match_score * (1.0 + SUCCESS_RATE_CASE_BOOST_SCALE * mean_similarity)).min(1.0)
    };

    let response_time = (1.0 - solution.response_time_min / RESPONSE_TIME_GOLDEN_WINDOW_MIN).max(0.0);
    let coverage_rate = solution.coverage_rate;
    let risk = 1.0 - solution.risk_level;
    let redundancy = redundancy_score(solution, candidates);

    SoftScores { success_rate, response_time, coverage_rate, risk, redundancy }
}

/// Average, across each capability this solution was required to cover, of
/// how many selected teams cover it beyond the first (spec §4.6
/// "redundancy"), clamped to `[0, 1]`.
fn redundancy_score(solution: &AllocationSolution, candidates: &[ResourceCandidate]) -> f64 {
    if solution.assignments.is_empty() {
        return 0.0;
    }
    let required: HashSet<&str> =
        solution.assignments.iter().flat_map(|a| a.assigned_capabilities.iter().map(String::as_str)).collect();
    if required.is_empty() {
        return 0.0;
    }

    let selected_ids: HashSet<&str> = solution.assignments.iter().map(|a| a.team_id.as_str()).collect();
    let selected_candidates: Vec<&ResourceCandidate> =
        candidates.iter().filter(|c| selected_ids.contains(c.team_id.as_str())).collect();

    let total: f64 = required
        .iter()
        .map(|cap| {
            let covering = selected_candidates.iter().filter(|c| c.capabilities.iter().any(|x| x == cap)).count();
            (covering.saturating_sub(1)) as f64
        })
        .sum();
    (total / required.len() as f64).clamp(0.0, 1.0)
}

fn capacity_gap(solution: &AllocationSolution, candidates: &[ResourceCandidate], disaster: &ParsedDisaster) -> i64 {
    let selected_ids: HashSet<&str> = solution.assignments.iter().map(|a| a.team_id.as_str()).collect();
    let total_capacity: i64 = candidates
        .iter()
        .filter(|c| selected_ids.contains(c.team_id.as_str()))
        .map(ResourceCandidate::rescue_capacity)
        .sum();
    disaster.estimated_trapped.unwrap_or(0) as i64 - total_capacity
}

fn reinforcement_level(coverage_rate: f64) -> ReinforcementLevel {
    if coverage_rate < REINFORCEMENT_NATIONAL_THRESHOLD {
        ReinforcementLevel::National
    } else if coverage_rate < REINFORCEMENT_PROVINCIAL_THRESHOLD {
        ReinforcementLevel::Provincial
    } else {
        ReinforcementLevel::Municipal
    }
}

/// Ranks among hard-rule-passing solutions by `weighted_score` descending,
/// ties broken by `coverage_rate` descending then `scheme_id` ascending
/// (spec §4.6 "Soft 5-D scoring"). Non-passing solutions keep rank 0.
fn assign_ranks(scores: &mut [SchemeScore]) {
    let mut passing: Vec<usize> = scores.iter().enumerate().filter(|(_, s)| s.hard_rule_passed).map(|(i, _)| i).collect();
    passing.sort_by(|&a, &b| {
        scores[b]
            .weighted_score
            .partial_cmp(&scores[a].weighted_score)
            .unwrap()
            .then_with(|| scores[b].soft_rule_scores.coverage_rate.partial_cmp(&scores[a].soft_rule_scores.coverage_rate).unwrap())
            .then_with(|| scores[a].scheme_id.cmp(&scores[b].scheme_id))
    });
    for (rank, idx) in passing.into_iter().enumerate() {
        scores[idx].rank = rank as u32 + 1;
    }
}

/// Catastrophe-mode combination (spec §4.6 "Selection"): unions the
/// allocations of the top-coverage solutions, deduplicated by team id, into
/// one "emergency" solution.
fn combine_for_catastrophe(
    solutions: &[AllocationSolution],
    candidates: &[ResourceCandidate],
    required: &HashSet<String>,
    disaster: &ParsedDisaster,
    similar_cases: &[SimilarCase],
    weights: &EvaluationWeights,
    hard_rules: &[crate::config::HardRule],
) -> Option<(AllocationSolution, SchemeScore)> {
    if solutions.is_empty() {
        return None;
    }
    let mut by_coverage: Vec<&AllocationSolution> = solutions.iter().collect();
    by_coverage.sort_by(|a, b| b.coverage_rate.partial_cmp(&a.coverage_rate).unwrap());
    let top = &by_coverage[..by_coverage.len().min(3)];

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut assignments: Vec<ResourceAssignment> = vec![];
    for solution in top {
        for assignment in &solution.assignments {
            if seen_ids.insert(assignment.team_id.clone()) {
                assignments.push(assignment.clone());
            }
        }
    }

    let combined = AllocationSolution::build("catastrophe-emergency".to_string(), assignments, required);
    let score = score_solution(&combined, candidates, disaster, similar_cases, weights, hard_rules, true);
    Some((combined, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::fakes::StaticLlmAdapter;
    use crate::adapters::llm::LlmParsedDisaster;
    use crate::config::{self, PipelineConfig};
    use crate::types::{BuildingDamageLevel, DisasterType, Location, Severity};

    fn ensure_config() {
        if !config::is_initialized() {
            config::init(PipelineConfig::default());
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
            estimated_trapped: Some(20),
            affected_population: Some(5000.0),
            additional_info: Default::default(),
        }
    }

    fn candidate(id: &str, caps: Vec<&str>, personnel: u32) -> ResourceCandidate {
        ResourceCandidate {
            team_id: id.to_string(),
            team_name: format!("Team {id}"),
            resource_type: "RESCUE_TEAM".to_string(),
            capabilities: caps.into_iter().map(String::from).collect(),
            location: Location::new(31.0, 104.0),
            distance_km: 10.0,
            eta_minutes: 15.0,
            capability_level: 4,
            personnel,
            match_score: 0.85,
        }
    }

    fn passing_solution() -> AllocationSolution {
        let required: HashSet<String> = ["LIFE_DETECTION".to_string()].into();
        AllocationSolution::build(
            "sol-pass".to_string(),
            vec![ResourceAssignment {
                team_id: "t1".to_string(),
                team_name: "Team t1".to_string(),
                assigned_capabilities: vec!["LIFE_DETECTION".to_string()],
                distance_km: 10.0,
                eta_minutes: 15.0,
                match_score: 0.9,
            }],
            &required,
        )
    }

    fn llm_fixture() -> StaticLlmAdapter {
        StaticLlmAdapter::new(LlmParsedDisaster {
            disaster_type: "earthquake".to_string(),
            severity: "critical".to_string(),
            magnitude: Some(6.5),
            depth_km: Some(10.0),
            affected_area_km2: None,
            building_damage_level: None,
            has_trapped_people: true,
            has_hazmat_release: false,
            has_infrastructure_collapse: true,
            has_fire: false,
            estimated_trapped: Some(20),
            affected_population: Some(5000.0),
        })
    }

    #[tokio::test]
    async fn passing_solution_is_recommended_without_catastrophe_mode() {
        ensure_config();
        let solutions = vec![passing_solution()];
        let candidates = vec![candidate("t1", vec!["LIFE_DETECTION"], 10)];
        let required: HashSet<String> = ["LIFE_DETECTION".to_string()].into();
        let llm = llm_fixture();
        let mut trace = Trace::new();
        let result =
            run(&solutions, &candidates, &required, &disaster(), &[], None, &[], &llm, &mut trace).await;
        assert!(!result.catastrophe_mode);
        assert!(result.recommended_solution.is_some());
        assert!(!result.scheme_explanation.is_empty());
    }

    #[tokio::test]
    async fn all_solutions_failing_hard_rules_engages_catastrophe_mode() {
        ensure_config();
        let required: HashSet<String> = ["LIFE_DETECTION".to_string(), "MEDICAL_TRIAGE".to_string()].into();
        let low_coverage = AllocationSolution::build(
            "sol-fail".to_string(),
            vec![ResourceAssignment {
                team_id: "t1".to_string(),
                team_name: "Team t1".to_string(),
                assigned_capabilities: vec!["LIFE_DETECTION".to_string()],
                distance_km: 10.0,
                eta_minutes: 15.0,
                match_score: 0.9,
            }],
            &required,
        );
        let candidates = vec![candidate("t1", vec!["LIFE_DETECTION"], 10)];
        let llm = llm_fixture();
        let mut trace = Trace::new();
        let result =
            run(&[low_coverage], &candidates, &required, &disaster(), &[], None, &[], &llm, &mut trace).await;
        assert!(result.catastrophe_mode);
        assert!(result.recommended_solution.is_some());
        assert!(result.scheme_scores.iter().any(|s| s.catastrophe_mode));
    }

    #[test]
    fn redundancy_clamped_to_one_with_many_backup_teams() {
        let required: HashSet<String> = ["LIFE_DETECTION".to_string()].into();
        let assignments = vec![ResourceAssignment {
            team_id: "t1".to_string(),
            team_name: "Team t1".to_string(),
            assigned_capabilities: vec!["LIFE_DETECTION".to_string()],
            distance_km: 10.0,
            eta_minutes: 15.0,
            match_score: 0.9,
        }];
        let solution = AllocationSolution::build("s".to_string(), assignments, &required);
        let candidates = vec![candidate("t1", vec!["LIFE_DETECTION"], 10)];
        assert!(redundancy_score(&solution, &candidates) <= 1.0);
    }

    #[test]
    fn reinforcement_level_escalates_as_coverage_drops() {
        assert_eq!(reinforcement_level(0.1), ReinforcementLevel::National);
        assert_eq!(reinforcement_level(0.4), ReinforcementLevel::Provincial);
        assert_eq!(reinforcement_level(0.9), ReinforcementLevel::Municipal);
    }
}
