//! Knowledge-graph adapter (spec §6, §4.3)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// One atomic trigger condition: `field <op> literal` (spec §4.3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggerCondition {
    pub field: String,
    pub op: ConditionOp,
    pub literal: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Eq,
    Gte,
    Gt,
}

/// Combinator joining a rule's trigger conditions (spec §4.3, default AND).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerLogic {
    And,
    Or,
}

impl Default for TriggerLogic {
    fn default() -> Self {
        TriggerLogic::And
    }
}

/// One task a rule triggers, before deduplication (spec §6 `QueryTRRRules`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTriggeredTask {
    pub task_code: String,
    pub task_name: String,
    pub priority: String,
    pub sequence: u32,
}

/// One capability a rule requires, before the resource-type mapping is
/// joined in (spec §6 `QueryTRRRules`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRequiredCapability {
    pub capability_code: String,
    pub capability_name: String,
}

/// A raw TRR rule record as returned by `QueryTRRRules` (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRuleRecord {
    pub rule_id: String,
    pub rule_name: String,
    pub disaster_type: String,
    pub priority: String,
    pub weight: f64,
    pub trigger_conditions: Vec<TriggerCondition>,
    #[serde(default)]
    pub trigger_logic: TriggerLogic,
    pub triggered_tasks: Vec<RawTriggeredTask>,
    pub required_capabilities: Vec<RawRequiredCapability>,
    /// Scene code this rule contributes to the HTN stage (spec §4.4
    /// "each rule declares one scene").
    pub scene_code: String,
}

/// One row of the capability→resource-type mapping (spec §6
/// `QueryCapabilityMapping`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CapabilityMappingEntry {
    pub capability_code: String,
    pub capability_name: String,
    pub resource_types: Vec<String>,
}

/// `QueryTRRRules` / `QueryCapabilityMapping` adapter contract (spec §6).
#[async_trait]
pub trait KnowledgeGraphAdapter: Send + Sync {
    async fn query_trr_rules(
        &self,
        disaster_type: &str,
        condition_snapshot: &serde_json::Value,
    ) -> Result<Vec<RawRuleRecord>, PipelineError>;

    async fn query_capability_mapping(
        &self,
        capability_codes: &[String],
    ) -> Result<Vec<CapabilityMappingEntry>, PipelineError>;
}

pub mod fakes {
    use super::*;

    /// Returns a fixed rule set (or an empty one, to exercise the built-in
    /// fallback path) and a fixed capability mapping.
    pub struct StaticKnowledgeGraph {
        pub rules: Vec<RawRuleRecord>,
        pub mapping: Vec<CapabilityMappingEntry>,
    }

    impl StaticKnowledgeGraph {
        pub fn new(rules: Vec<RawRuleRecord>, mapping: Vec<CapabilityMappingEntry>) -> Self {
            Self { rules, mapping }
        }

        pub fn empty() -> Self {
            Self { rules: vec![], mapping: vec![] }
        }
    }

    #[async_trait]
    impl KnowledgeGraphAdapter for StaticKnowledgeGraph {
        async fn query_trr_rules(
            &self,
            disaster_type: &str,
            _condition_snapshot: &serde_json::Value,
        ) -> Result<Vec<RawRuleRecord>, PipelineError> {
            Ok(self
                .rules
                .iter()
                .filter(|r| r.disaster_type == disaster_type)
                .cloned()
                .collect())
        }

        async fn query_capability_mapping(
            &self,
            capability_codes: &[String],
        ) -> Result<Vec<CapabilityMappingEntry>, PipelineError> {
            Ok(self
                .mapping
                .iter()
                .filter(|m| capability_codes.contains(&m.capability_code))
                .cloned()
                .collect())
        }
    }

    /// Always fails at the transport layer (spec §7 `KGUnavailable`).
    pub struct FailingKnowledgeGraph;

    #[async_trait]
    impl KnowledgeGraphAdapter for FailingKnowledgeGraph {
        async fn query_trr_rules(
            &self,
            _disaster_type: &str,
            _condition_snapshot: &serde_json::Value,
        ) -> Result<Vec<RawRuleRecord>, PipelineError> {
            Err(PipelineError::KgUnavailable("fixture transport failure".to_string()))
        }

        async fn query_capability_mapping(
            &self,
            _capability_codes: &[String],
        ) -> Result<Vec<CapabilityMappingEntry>, PipelineError> {
            Err(PipelineError::KgUnavailable("fixture transport failure".to_string()))
        }
    }
}
