//! HTN Decomposer stage output types (spec §3, §4.4)

use serde::{Deserialize, Serialize};

/// One task in the topologically-sorted execution sequence (spec §3
/// "TaskSequenceItem").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskSequenceItem {
    /// 1-based position in the final topological order (spec §3).
    pub sequence_index: u32,
    pub task_id: String,
    pub task_name: String,
    pub depends_on: Vec<String>,
    /// The scene codes that contributed this meta-task, deduplicated
    /// (spec §3; a task merged from two chains carries both scenes).
    pub scene_codes: Vec<String>,
}

/// A set of task ids that share the same topological level and have no
/// mutual dependencies (spec §3, §4.4).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParallelGroup {
    pub task_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_sequence_item_tracks_sequence_index() {
        let item = TaskSequenceItem {
            sequence_index: 1,
            task_id: "M1".to_string(),
            task_name: "Search collapsed structures".to_string(),
            depends_on: vec![],
            scene_codes: vec!["building-collapse-search".to_string()],
        };
        assert_eq!(item.sequence_index, 1);
    }
}
