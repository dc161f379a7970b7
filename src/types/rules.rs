//! Rule Reasoning stage output types (spec §3, §4.3)

use serde::{Deserialize, Serialize};

/// A capability required by the response, attributed back to the rule that
/// introduced it for explanation traceability (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CapabilityRequirement {
    pub capability: String,
    pub min_count: u32,
    pub priority: u32,
    /// `rule_id` that introduced this requirement; `None` for built-in
    /// fallback rules with no backing knowledge-graph rule id.
    pub source_rule: Option<String>,
    /// Resource-type codes that provide this capability, joined in from the
    /// KG's capability→resource mapping (spec §4.3 "Deduplication and
    /// ordering"). Empty when the mapping has no entry for this capability.
    #[serde(default)]
    pub resource_types: Vec<String>,
}

/// A rule matched by the knowledge-graph query or a built-in fallback rule,
/// after trigger-condition evaluation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchedRule {
    pub rule_id: String,
    pub description: String,
    pub sequence: u32,
    pub priority: u32,
    pub capability_requirements: Vec<CapabilityRequirement>,
    pub meta_task_ids: Vec<String>,
}

/// One entry of the deduplicated, ordered task list the Reasoning stage
/// produces (spec §4.3 "Produce matched rules, a deduplicated ordered task
/// list, and a capability-requirement list"). Deduplicated by `task_code`,
/// keeping the minimum `sequence` and the highest priority seen across every
/// rule that triggered it; ordered ascending by `sequence` then by
/// `priority` rank.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggeredTask {
    pub task_code: String,
    pub task_name: String,
    pub sequence: u32,
    pub priority: u32,
    /// `rule_id` of the first rule that introduced this task, by insertion
    /// order among rules with the winning (sequence, priority).
    pub source_rule: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_requirement_without_source_rule_is_fallback() {
        let req = CapabilityRequirement {
            capability: "search_and_rescue".to_string(),
            min_count: 2,
            priority: 1,
            source_rule: None,
            resource_types: vec![],
        };
        assert!(req.source_rule.is_none());
    }
}
