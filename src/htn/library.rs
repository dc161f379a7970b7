//! Meta-task library loading (spec §4.4, §6 "Meta-task library")
//!
//! Deserialized with `serde`/`serde_json`. Meta-task ids referenced in chains but missing
//! from `meta_tasks` are a load-time error (spec §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaTask {
    pub name: String,
    /// `critical` | `high` | `medium` | `low`, used as the Kahn's-algorithm
    /// tie-break key (spec §4.4).
    pub priority: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainStep {
    pub mt_id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaTaskLibrary {
    pub meta_tasks: HashMap<String, MetaTask>,
    pub chains: HashMap<String, Vec<ChainStep>>,
    pub scene_to_chain: HashMap<String, String>,
}

impl MetaTaskLibrary {
    /// Built-in library covering the scene codes the reasoning fallback
    /// rules emit (spec §4.4 "Scene → chain mapping"). Loaded once at
    /// process start, `FormationPrognosis::load()`-style.
    pub fn load() -> Result<Self, PipelineError> {
        if let Ok(path) = std::env::var("TRIAGE_META_TASK_LIBRARY") {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| PipelineError::ConfigError(format!("reading {path}: {e}")))?;
            let library: Self = serde_json::from_str(&text)
                .map_err(|e| PipelineError::ConfigError(format!("parsing {path}: {e}")))?;
            library.validate()?;
            return Ok(library);
        }
        let library: Self = serde_json::from_str(DEFAULT_LIBRARY_JSON)
            .expect("built-in meta-task library JSON is malformed");
        library.validate()?;
        Ok(library)
    }

    /// Every meta-task id referenced by a chain must exist in `meta_tasks`.
    fn validate(&self) -> Result<(), PipelineError> {
        for (chain_id, steps) in &self.chains {
            for step in steps {
                if !self.meta_tasks.contains_key(&step.mt_id) {
                    return Err(PipelineError::ConfigError(format!(
                        "chain '{chain_id}' references unknown meta-task id '{}'",
                        step.mt_id
                    )));
                }
                for dep in &step.depends_on {
                    if !self.meta_tasks.contains_key(dep) {
                        return Err(PipelineError::ConfigError(format!(
                            "chain '{chain_id}' step '{}' depends on unknown meta-task id '{dep}'",
                            step.mt_id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

const DEFAULT_LIBRARY_JSON: &str = r#"
{
  "meta_tasks": {
    "M1": { "name": "Search collapsed structures", "priority": "critical" },
    "M2": { "name": "Extract trapped persons", "priority": "critical" },
    "M3": { "name": "Medical triage", "priority": "high" },
    "M4": { "name": "Casualty transport", "priority": "medium" },
    "FIRE1": { "name": "Suppress secondary fire", "priority": "high" },
    "WATER1": { "name": "Swift-water rescue", "priority": "critical" },
    "WATER2": { "name": "Evacuate flood zone", "priority": "high" },
    "HAZ1": { "name": "Contain hazmat leak", "priority": "critical" },
    "HAZ2": { "name": "Decontaminate casualties", "priority": "high" },
    "GEN1": { "name": "General search and rescue", "priority": "medium" }
  },
  "chains": {
    "EQ-BASIC": [
      { "mt_id": "M1", "depends_on": [] },
      { "mt_id": "M2", "depends_on": ["M1"] },
      { "mt_id": "M3", "depends_on": ["M1"] },
      { "mt_id": "M4", "depends_on": ["M2", "M3"] }
    ],
    "EQ-FIRE": [
      { "mt_id": "FIRE1", "depends_on": [] },
      { "mt_id": "M3", "depends_on": ["M2"] }
    ],
    "FL-BASIC": [
      { "mt_id": "WATER1", "depends_on": [] },
      { "mt_id": "WATER2", "depends_on": ["WATER1"] },
      { "mt_id": "M3", "depends_on": ["WATER1"] }
    ],
    "HZ-BASIC": [
      { "mt_id": "HAZ1", "depends_on": [] },
      { "mt_id": "HAZ2", "depends_on": ["HAZ1"] },
      { "mt_id": "M3", "depends_on": ["HAZ1"] }
    ],
    "GEN-BASIC": [
      { "mt_id": "GEN1", "depends_on": [] }
    ]
  },
  "scene_to_chain": {
    "building-collapse-search": "EQ-BASIC",
    "secondary-fire": "EQ-FIRE",
    "flood-rescue": "FL-BASIC",
    "hazmat-containment": "HZ-BASIC",
    "general-response": "GEN-BASIC"
  }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_library_validates() {
        MetaTaskLibrary::load().unwrap();
    }

    #[test]
    fn eq_basic_chain_has_four_meta_tasks() {
        let library = MetaTaskLibrary::load().unwrap();
        assert_eq!(library.chains["EQ-BASIC"].len(), 4);
    }
}
