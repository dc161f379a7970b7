//! Rule Reasoning stage (spec §4.3)
//!
//! Queries the knowledge graph for TRR rules, evaluates their trigger
//! conditions against the parsed disaster, deduplicates and orders the
//! triggered tasks, and derives capability requirements. Falls back to a
//! deterministic built-in rule set when the KG returns nothing.

mod condition;
mod fallback;

pub use condition::{evaluate_conditions, ConditionError};

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::adapters::knowledge_graph::{RawRuleRecord, RawTriggeredTask};
use crate::adapters::KnowledgeGraphAdapter;
use crate::types::{CapabilityRequirement, MatchedRule, ParsedDisaster, Trace, TriggeredTask};

/// Maps the KG's string priority labels to an ascending rank
/// (critical < high < medium < low), per spec §4.3 "Deduplication and
/// ordering".
pub fn priority_rank(priority: &str) -> u32 {
    match priority.to_lowercase().as_str() {
        "critical" => 0,
        "high" => 1,
        "medium" => 2,
        _ => 3,
    }
}

/// One scene + its source rule, threaded into the HTN stage.
#[derive(Debug, Clone)]
pub struct ReasoningResult {
    pub matched_rules: Vec<MatchedRule>,
    pub capability_requirements: Vec<CapabilityRequirement>,
    pub scene_codes: Vec<String>,
    /// The deduplicated, ordered task list (spec §4.3), ascending by
    /// `sequence` then by priority rank.
    pub triggered_tasks: Vec<TriggeredTask>,
}

/// Runs the Reasoning stage.
pub async fn run(
    disaster: &ParsedDisaster,
    kg: &dyn KnowledgeGraphAdapter,
    trace: &mut Trace,
) -> ReasoningResult {
    let disaster_type = disaster_type_key(disaster);
    let snapshot = disaster.condition_snapshot();

    trace.kg_calls += 1;
    let raw_rules = match kg.query_trr_rules(&disaster_type, &snapshot).await {
        Ok(rules) => rules,
        Err(e) => {
            warn!(error = %e, "knowledge graph query failed, using built-in fallback rules");
            vec![]
        }
    };

    let (raw_rules, used_fallback) = if raw_rules.is_empty() {
        (fallback::default_rules(&disaster_type, disaster), true)
    } else {
        (raw_rules, false)
    };

    if used_fallback {
        debug!(disaster_type = %disaster_type, "no KG rules matched, using built-in defaults");
    }

    let mut matched_rules = vec![];
    let mut scene_codes = vec![];
    // task_code -> (sequence, priority_rank, rule_id, task_name)
    let mut tasks: HashMap<String, (u32, u32, String, String)> = HashMap::new();
    let mut capability_requirements: Vec<CapabilityRequirement> = vec![];
    let mut seen_capabilities: HashMap<String, usize> = HashMap::new();

    for rule in &raw_rules {
        let matches = condition::evaluate_conditions(&rule.trigger_conditions, rule.trigger_logic, &snapshot)
            .unwrap_or(false);
        if !matches {
            continue;
        }

        scene_codes.push(rule.scene_code.clone());

        for task in &rule.triggered_tasks {
            upsert_task(&mut tasks, task, &rule.rule_id);
        }

        for cap in &rule.required_capabilities {
            let req = CapabilityRequirement {
                capability: cap.capability_code.clone(),
                min_count: 1,
                priority: priority_rank(&rule.priority),
                source_rule: Some(rule.rule_id.clone()),
                resource_types: vec![],
            };
            if let Some(&idx) = seen_capabilities.get(&cap.capability_code) {
                let existing: &mut CapabilityRequirement = &mut capability_requirements[idx];
                if req.priority < existing.priority {
                    existing.priority = req.priority;
                }
            } else {
                seen_capabilities.insert(cap.capability_code.clone(), capability_requirements.len());
                capability_requirements.push(req);
            }
        }

        matched_rules.push(MatchedRule {
            rule_id: rule.rule_id.clone(),
            description: rule.rule_name.clone(),
            sequence: rule.triggered_tasks.iter().map(|t| t.sequence).min().unwrap_or(0),
            priority: priority_rank(&rule.priority),
            capability_requirements: rule
                .required_capabilities
                .iter()
                .map(|c| CapabilityRequirement {
                    capability: c.capability_code.clone(),
                    min_count: 1,
                    priority: priority_rank(&rule.priority),
                    source_rule: Some(rule.rule_id.clone()),
                    resource_types: vec![],
                })
                .collect(),
            meta_task_ids: rule.triggered_tasks.iter().map(|t| t.task_code.clone()).collect(),
        });
    }

    scene_codes.sort();
    scene_codes.dedup();

    if !capability_requirements.is_empty() {
        let codes: Vec<String> = capability_requirements.iter().map(|r| r.capability.clone()).collect();
        trace.kg_calls += 1;
        match kg.query_capability_mapping(&codes).await {
            Ok(mapping) => {
                let by_code: HashMap<&str, &[String]> =
                    mapping.iter().map(|m| (m.capability_code.as_str(), m.resource_types.as_slice())).collect();
                for req in capability_requirements.iter_mut() {
                    if let Some(types) = by_code.get(req.capability.as_str()) {
                        req.resource_types = types.to_vec();
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "capability→resource mapping query failed, leaving resource_types empty");
            }
        }
    }

    let mut triggered_tasks: Vec<TriggeredTask> = tasks
        .into_iter()
        .map(|(task_code, (sequence, priority, source_rule, task_name))| TriggeredTask {
            task_code,
            task_name,
            sequence,
            priority,
            source_rule,
        })
        .collect();
    // Final order: ascending sequence, then priority rank (spec §4.3
    // "Deduplication and ordering").
    triggered_tasks.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.priority.cmp(&b.priority)));

    debug!(
        matched_rules = matched_rules.len(),
        capability_requirements = capability_requirements.len(),
        triggered_tasks = triggered_tasks.len(),
        "rule reasoning complete"
    );

    ReasoningResult {
        matched_rules,
        capability_requirements,
        scene_codes,
        triggered_tasks,
    }
}

fn upsert_task(tasks: &mut HashMap<String, (u32, u32, String, String)>, task: &RawTriggeredTask, rule_id: &str) {
    let rank = priority_rank(&task.priority);
    tasks
        .entry(task.task_code.clone())
        .and_modify(|(seq, pr, _rid, _name)| {
            if task.sequence < *seq {
                *seq = task.sequence;
            }
            if rank < *pr {
                *pr = rank;
            }
        })
        .or_insert_with(|| (task.sequence, rank, rule_id.to_string(), task.task_name.clone()));
}

fn disaster_type_key(disaster: &ParsedDisaster) -> String {
    match &disaster.disaster_type {
        crate::types::DisasterType::Earthquake => "earthquake".to_string(),
        crate::types::DisasterType::Flood => "flood".to_string(),
        crate::types::DisasterType::Hazmat => "hazmat".to_string(),
        crate::types::DisasterType::Other(s) => s.clone(),
    }
}
