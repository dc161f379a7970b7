//! Built-in default rules used when the knowledge graph returns no rules
//! for a disaster type (spec §4.3 "Fallback"). Deterministic: same
//! `ParsedDisaster` always yields the same rule set.

use crate::adapters::knowledge_graph::{RawRequiredCapability, RawRuleRecord, RawTriggeredTask, TriggerLogic};
use crate::types::ParsedDisaster;

fn task(code: &str, name: &str, priority: &str, sequence: u32) -> RawTriggeredTask {
    RawTriggeredTask {
        task_code: code.to_string(),
        task_name: name.to_string(),
        priority: priority.to_string(),
        sequence,
    }
}

fn capability(code: &str, name: &str) -> RawRequiredCapability {
    RawRequiredCapability { capability_code: code.to_string(), capability_name: name.to_string() }
}

fn rule(
    id_suffix: &str,
    disaster_type: &str,
    prefix: &str,
    rule_name: &str,
    priority: &str,
    tasks: Vec<RawTriggeredTask>,
    capabilities: Vec<RawRequiredCapability>,
    scene_code: &str,
) -> RawRuleRecord {
    RawRuleRecord {
        rule_id: format!("{prefix}-{id_suffix}"),
        rule_name: rule_name.to_string(),
        disaster_type: disaster_type.to_string(),
        priority: priority.to_string(),
        weight: 1.0,
        trigger_conditions: vec![],
        trigger_logic: TriggerLogic::And,
        triggered_tasks: tasks,
        required_capabilities: capabilities,
        scene_code: scene_code.to_string(),
    }
}

/// Built-in default rules keyed on `disaster_type` and the boolean flags
/// of `ParsedDisaster` (spec §4.3).
pub fn default_rules(disaster_type: &str, disaster: &ParsedDisaster) -> Vec<RawRuleRecord> {
    let mut rules = vec![];

    match disaster_type {
        "earthquake" => {
            if disaster.has_infrastructure_collapse || disaster.has_trapped_people {
                rules.push(rule(
                    "001",
                    disaster_type,
                    "DEFAULT-EQ",
                    "Structural search and rescue",
                    "critical",
                    vec![
                        task("SEARCH_RESCUE", "Search and rescue", "critical", 1),
                        task("STRUCTURAL_RESCUE", "Structural rescue", "critical", 1),
                        task("MEDICAL_TRIAGE", "Medical triage", "high", 2),
                    ],
                    vec![
                        capability("LIFE_DETECTION", "Life detection"),
                        capability("STRUCTURAL_RESCUE", "Structural rescue"),
                        capability("MEDICAL_TRIAGE", "Medical triage"),
                    ],
                    "building-collapse-search",
                ));
            }
            if disaster.has_fire {
                rules.push(rule(
                    "002",
                    disaster_type,
                    "DEFAULT-EQ",
                    "Secondary fire suppression",
                    "high",
                    vec![task("FIRE_SUPPRESSION", "Fire suppression", "high", 1)],
                    vec![capability("FIRE_SUPPRESSION", "Fire suppression")],
                    "secondary-fire",
                ));
            }
        }
        "flood" => {
            rules.push(rule(
                "001",
                disaster_type,
                "DEFAULT-FL",
                "Flood water rescue",
                "critical",
                vec![
                    task("WATER_RESCUE", "Water rescue", "critical", 1),
                    task("MEDICAL_TRIAGE", "Medical triage", "high", 2),
                ],
                vec![
                    capability("WATER_RESCUE", "Water rescue"),
                    capability("MEDICAL_TRIAGE", "Medical triage"),
                ],
                "flood-rescue",
            ));
        }
        "hazmat" => {
            rules.push(rule(
                "001",
                disaster_type,
                "DEFAULT-HZ",
                "Hazmat containment",
                "critical",
                vec![
                    task("HAZMAT_CONTAINMENT", "Hazmat containment", "critical", 1),
                    task("MEDICAL_TRIAGE", "Medical triage", "high", 2),
                ],
                vec![
                    capability("HAZMAT_CONTAINMENT", "Hazmat containment"),
                    capability("MEDICAL_TRIAGE", "Medical triage"),
                ],
                "hazmat-containment",
            ));
        }
        _ => {
            rules.push(rule(
                "001",
                disaster_type,
                "DEFAULT-GEN",
                "General emergency response",
                "medium",
                vec![task("SEARCH_RESCUE", "Search and rescue", "medium", 1)],
                vec![capability("LIFE_DETECTION", "Life detection")],
                "general-response",
            ));
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildingDamageLevel, DisasterType, Severity};

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
            estimated_trapped: Some(200),
            affected_population: Some(15000.0),
            additional_info: Default::default(),
        }
    }

    #[test]
    fn earthquake_collapse_yields_rule_id_prefixed_default_eq() {
        let rules = default_rules("earthquake", &disaster());
        assert_eq!(rules.len(), 1);
        assert!(rules[0].rule_id.starts_with("DEFAULT-EQ-"));
        let codes: Vec<_> = rules[0]
            .required_capabilities
            .iter()
            .map(|c| c.capability_code.as_str())
            .collect();
        assert!(codes.contains(&"LIFE_DETECTION"));
        assert!(codes.contains(&"STRUCTURAL_RESCUE"));
        assert!(codes.contains(&"MEDICAL_TRIAGE"));
    }

    #[test]
    fn earthquake_with_fire_adds_second_rule() {
        let mut d = disaster();
        d.has_fire = true;
        let rules = default_rules("earthquake", &d);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn unknown_disaster_type_still_yields_deterministic_rule() {
        let rules = default_rules("tsunami", &disaster());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_id, "DEFAULT-GEN-001");
    }
}
