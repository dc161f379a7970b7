//! Append-only stage trace threaded through every run (spec §3 "Trace")

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered record of stages executed plus adapter-call counters and
/// per-stage free-form notes. Never truncated or reordered within a run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Trace {
    pub phases_executed: Vec<String>,
    pub llm_calls: u32,
    pub rag_calls: u32,
    pub kg_calls: u32,
    /// Free-form per-stage notes, e.g. `parallel_optimization`,
    /// `search_expanded`, `algorithm_used` (spec §3).
    pub notes: HashMap<String, serde_json::Value>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage name. Each stage is recorded at most once per run
    /// (spec §8 "no stage function is invoked more than once per run").
    pub fn record_stage(&mut self, stage: &str) {
        self.phases_executed.push(stage.to_string());
    }

    pub fn note(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.notes.insert(key.to_string(), value.into());
    }

    pub fn note_bool(&mut self, key: &str, value: bool) {
        self.note(key, serde_json::Value::Bool(value));
    }
}
