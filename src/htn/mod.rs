//! HTN Decomposer stage (spec §4.4)
//!
//! Maps matched-rule scene codes to meta-task chains, merges chains by
//! meta-task id (union of dependency sets), topologically sorts with
//! Kahn's algorithm, and groups meta-tasks into parallel levels.

pub mod library;

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::htn::library::MetaTaskLibrary;
use crate::types::{ParallelGroup, TaskSequenceItem};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HtnError {
    #[error("meta-task dependency graph contains a cycle: {0:?}")]
    Cycle(Vec<String>),
}

struct MergedTask {
    depends_on: HashSet<String>,
    scenes: HashSet<String>,
    priority_rank: u32,
    insertion_order: usize,
}

fn priority_rank(priority: &str) -> u32 {
    match priority {
        "critical" => 0,
        "high" => 1,
        "medium" => 2,
        _ => 3,
    }
}

pub struct DecompositionResult {
    pub task_sequence: Vec<TaskSequenceItem>,
    pub parallel_tasks: Vec<ParallelGroup>,
}

/// Runs the HTN stage over a deduplicated scene-code list (spec §4.4).
pub fn decompose(
    scene_codes: &[String],
    library: &MetaTaskLibrary,
) -> Result<DecompositionResult, HtnError> {
    let mut merged: HashMap<String, MergedTask> = HashMap::new();
    let mut insertion_counter = 0usize;

    for scene_code in scene_codes {
        let Some(chain_id) = library.scene_to_chain.get(scene_code) else {
            debug!(scene_code = %scene_code, "no chain mapped for scene, skipping");
            continue;
        };
        let Some(steps) = library.chains.get(chain_id) else {
            debug!(chain_id = %chain_id, "chain id mapped but not present in library, skipping");
            continue;
        };

        for step in steps {
            let mt = library.meta_tasks.get(&step.mt_id).expect("library validated at load time");
            let entry = merged.entry(step.mt_id.clone()).or_insert_with(|| {
                let order = insertion_counter;
                insertion_counter += 1;
                MergedTask {
                    depends_on: HashSet::new(),
                    scenes: HashSet::new(),
                    priority_rank: priority_rank(&mt.priority),
                    insertion_order: order,
                }
            });
            // Merging by MT id: dependency set is the UNION across chains
            // that both reference this MT (spec §4.4).
            entry.depends_on.extend(step.depends_on.iter().cloned());
            entry.scenes.insert(scene_code.clone());
        }
    }

    topological_levels(&merged, library)
}

fn topological_levels(
    merged: &HashMap<String, MergedTask>,
    library: &MetaTaskLibrary,
) -> Result<DecompositionResult, HtnError> {
    // Only count dependencies on meta-tasks that are actually part of this
    // decomposition's merged set — a chain may declare `depends_on` on an MT
    // pulled in only by a scene that wasn't selected, and such a dependency
    // can never be satisfied or violated, so it must not hold up indegree.
    let mut indegree: HashMap<String, usize> = merged
        .iter()
        .map(|(id, task)| (id.clone(), task.depends_on.iter().filter(|d| merged.contains_key(*d)).count()))
        .collect();
    let mut remaining: HashSet<String> = merged.keys().cloned().collect();

    let mut task_sequence = vec![];
    let mut parallel_tasks = vec![];
    let mut sequence_index = 0u32;

    while !remaining.is_empty() {
        let mut ready: Vec<&String> = remaining
            .iter()
            .filter(|id| indegree.get(*id).copied().unwrap_or(0) == 0)
            .collect();

        if ready.is_empty() {
            let mut stuck: Vec<String> = remaining.iter().cloned().collect();
            stuck.sort();
            return Err(HtnError::Cycle(stuck));
        }

        ready.sort_by_key(|id| {
            let task = &merged[*id];
            (task.priority_rank, task.insertion_order)
        });

        let level_ids: Vec<String> = ready.into_iter().cloned().collect();

        for id in &level_ids {
            let task = &merged[id];
            sequence_index += 1;
            let mut depends_on: Vec<String> = task.depends_on.iter().cloned().collect();
            depends_on.sort();
            let mut scene_codes: Vec<String> = task.scenes.iter().cloned().collect();
            scene_codes.sort();
            task_sequence.push(TaskSequenceItem {
                sequence_index,
                task_id: id.clone(),
                task_name: library.meta_tasks[id].name.clone(),
                depends_on,
                scene_codes,
            });
        }

        parallel_tasks.push(ParallelGroup { task_ids: level_ids.clone() });

        for id in &level_ids {
            remaining.remove(id);
        }
        for id in remaining.iter() {
            let deps_in_level = merged[id].depends_on.iter().filter(|d| level_ids.contains(d)).count();
            if deps_in_level > 0 {
                *indegree.get_mut(id).unwrap() -= deps_in_level;
            }
        }
    }

    Ok(DecompositionResult { task_sequence, parallel_tasks })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_basic_scene_produces_topological_order() {
        let library = MetaTaskLibrary::load().unwrap();
        let result = decompose(&["building-collapse-search".to_string()], &library).unwrap();
        assert_eq!(result.task_sequence.len(), 4);
        let positions: HashMap<&str, u32> = result
            .task_sequence
            .iter()
            .map(|t| (t.task_id.as_str(), t.sequence_index))
            .collect();
        assert!(positions["M1"] < positions["M2"]);
        assert!(positions["M1"] < positions["M3"]);
        assert!(positions["M2"] < positions["M4"]);
        assert!(positions["M3"] < positions["M4"]);
    }

    #[test]
    fn merged_dependency_set_is_union_across_chains() {
        // EQ-BASIC declares M3 depends_on [M1]; EQ-FIRE declares M3 depends_on [M2].
        let library = MetaTaskLibrary::load().unwrap();
        let result =
            decompose(&["building-collapse-search".to_string(), "secondary-fire".to_string()], &library).unwrap();
        let m3 = result.task_sequence.iter().find(|t| t.task_id == "M3").unwrap();
        assert!(m3.depends_on.contains(&"M1".to_string()));
        assert!(m3.depends_on.contains(&"M2".to_string()));

        let m1_index = result.task_sequence.iter().find(|t| t.task_id == "M1").unwrap().sequence_index;
        let m2_index = result.task_sequence.iter().find(|t| t.task_id == "M2").unwrap().sequence_index;
        assert!(m3.sequence_index > m1_index);
        assert!(m3.sequence_index > m2_index);

        let group_with_both = result
            .parallel_tasks
            .iter()
            .find(|g| g.task_ids.contains(&"M1".to_string()) && g.task_ids.contains(&"FIRE1".to_string()));
        assert!(group_with_both.is_some());
    }

    #[test]
    fn depends_on_ids_always_appear_earlier_in_sequence() {
        let library = MetaTaskLibrary::load().unwrap();
        let result = decompose(&["flood-rescue".to_string()], &library).unwrap();
        let index_of: HashMap<&str, u32> =
            result.task_sequence.iter().map(|t| (t.task_id.as_str(), t.sequence_index)).collect();
        for item in &result.task_sequence {
            for dep in &item.depends_on {
                assert!(index_of[dep.as_str()] < item.sequence_index);
            }
        }
    }

    #[test]
    fn unmapped_scene_code_is_skipped_without_error() {
        let library = MetaTaskLibrary::load().unwrap();
        let result = decompose(&["unknown-scene".to_string()], &library).unwrap();
        assert!(result.task_sequence.is_empty());
    }

    #[test]
    fn scene_selected_alone_does_not_false_cycle_on_cross_chain_dependency() {
        // EQ-FIRE's M3 depends_on M2, which only EQ-BASIC contributes. When
        // `secondary-fire` is the only selected scene, M2 never enters the
        // merged set, so M3's dependency on it must not hold up indegree.
        let library = MetaTaskLibrary::load().unwrap();
        let result = decompose(&["secondary-fire".to_string()], &library).unwrap();
        let ids: HashSet<&str> = result.task_sequence.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["FIRE1", "M3"]));
    }
}
