//! Scheme explanation assembly (spec §4.6 "Explanation")

use tracing::warn;

use crate::adapters::llm::SchemeExplanation;
use crate::adapters::LlmAdapter;
use crate::types::{AllocationSolution, ParsedDisaster, TaskSequenceItem, Trace};

/// Calls the LLM for a structured explanation and assembles it into a fixed
/// Markdown document; falls back to a minimal, non-LLM explanation on
/// failure (spec: "The LLM failure is not an error").
pub async fn assemble(
    solution: &AllocationSolution,
    disaster: &ParsedDisaster,
    alternatives: &[AllocationSolution],
    task_sequence: &[TaskSequenceItem],
    llm: &dyn LlmAdapter,
    trace: &mut Trace,
) -> String {
    trace.llm_calls += 1;
    match llm.explain_scheme(solution, disaster, alternatives, task_sequence).await {
        Ok(explanation) => render_markdown(&explanation),
        Err(e) => {
            warn!(error = %e, "scheme explanation LLM call failed, using minimal explanation");
            trace.note("explanation_fallback", "llm_failure");
            minimal_explanation(solution)
        }
    }
}

fn render_markdown(e: &SchemeExplanation) -> String {
    let mut out = String::new();
    out.push_str("## Summary\n\n");
    out.push_str(&e.summary);
    out.push_str("\n\n## Situation Assessment\n\n");
    out.push_str(&e.situation_assessment);
    out.push_str("\n\n## Selection Reason\n\n");
    out.push_str(&e.selection_reason);
    out.push_str("\n\n## Key Advantages\n\n");
    push_list(&mut out, &e.key_advantages);
    out.push_str("\n## Resource Deployment\n\n");
    push_list(&mut out, &e.resource_deployment);
    out.push_str("\n## Timeline\n\n");
    push_list(&mut out, &e.timeline);
    out.push_str("\n## Coordination Points\n\n");
    push_list(&mut out, &e.coordination_points);
    out.push_str("\n## Potential Risks\n\n");
    push_list(&mut out, &e.potential_risks);
    out.push_str("\n## Mitigation Measures\n\n");
    push_list(&mut out, &e.mitigation_measures);
    out.push_str("\n## Execution Suggestions\n\n");
    push_list(&mut out, &e.execution_suggestions);
    out.push_str("\n## Commander Notes\n\n");
    out.push_str(&e.commander_notes);
    out.push('\n');
    out
}

fn push_list(out: &mut String, items: &[String]) {
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}

/// Non-LLM fallback: a bare list of allocations and headline metrics.
fn minimal_explanation(solution: &AllocationSolution) -> String {
    let mut out = String::new();
    out.push_str("## Summary\n\n");
    out.push_str(&format!(
        "{} teams deployed, {:.0}% capability coverage, {:.0} min to furthest team.\n\n",
        solution.teams_count,
        solution.coverage_rate * 100.0,
        solution.response_time_min
    ));
    out.push_str("## Resource Deployment\n\n");
    for assignment in &solution.assignments {
        out.push_str(&format!(
            "- {} ({}): {}\n",
            assignment.team_name,
            assignment.team_id,
            assignment.assigned_capabilities.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::fakes::{FailingLlmAdapter, StaticLlmAdapter};
    use crate::adapters::llm::LlmParsedDisaster;
    use crate::types::{BuildingDamageLevel, DisasterType, ResourceAssignment, Severity};
    use std::collections::HashSet;

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

    fn solution() -> AllocationSolution {
        let required: HashSet<String> = ["LIFE_DETECTION".to_string()].into();
        AllocationSolution::build(
            "s".to_string(),
            vec![ResourceAssignment {
                team_id: "t1".to_string(),
                team_name: "Alpha".to_string(),
                assigned_capabilities: vec!["LIFE_DETECTION".to_string()],
                distance_km: 10.0,
                eta_minutes: 15.0,
                match_score: 0.9,
            }],
            &required,
        )
    }

    #[tokio::test]
    async fn successful_llm_call_renders_fixed_headings() {
        let llm = StaticLlmAdapter::new(LlmParsedDisaster {
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
        });
        let mut trace = Trace::new();
        let markdown = assemble(&solution(), &disaster(), &[], &[], &llm, &mut trace).await;
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Commander Notes"));
    }

    #[tokio::test]
    async fn failing_llm_call_falls_back_to_minimal_explanation() {
        let llm = FailingLlmAdapter;
        let mut trace = Trace::new();
        let markdown = assemble(&solution(), &disaster(), &[], &[], &llm, &mut trace).await;
        assert!(markdown.contains("Alpha"));
        assert!(trace.notes.contains_key("explanation_fallback"));
    }
}
