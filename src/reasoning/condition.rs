//! Trigger-condition DSL (spec §4.3)
//!
//! An atom is `field <op> literal`; booleans compare as literals
//! `true`/`false`, numerics are coerced, and missing fields compare as
//! falsy. A combinator (`AND`/`OR`, default `AND`) joins a rule's atoms;
//! an empty condition list trivially matches.

use thiserror::Error;

use crate::adapters::knowledge_graph::{ConditionOp, TriggerCondition, TriggerLogic};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("unsupported literal type for condition on field '{0}'")]
    UnsupportedLiteral(String),
}

/// Evaluates one atomic condition against the snapshot.
fn evaluate_atom(atom: &TriggerCondition, snapshot: &serde_json::Value) -> bool {
    let actual = snapshot.get(&atom.field);

    match (&atom.op, actual) {
        (ConditionOp::Eq, Some(actual)) => values_equal(actual, &atom.literal),
        (ConditionOp::Eq, None) => is_falsy(&atom.literal),
        (ConditionOp::Gte, Some(actual)) => match (as_f64(actual), as_f64(&atom.literal)) {
            (Some(a), Some(l)) => a >= l,
            _ => false,
        },
        (ConditionOp::Gte, None) => false,
        (ConditionOp::Gt, Some(actual)) => match (as_f64(actual), as_f64(&atom.literal)) {
            (Some(a), Some(l)) => a > l,
            _ => false,
        },
        (ConditionOp::Gt, None) => false,
    }
}

fn values_equal(actual: &serde_json::Value, literal: &serde_json::Value) -> bool {
    if actual == literal {
        return true;
    }
    // Numeric coercion: 6.5 == 6.5 already handled by equality; handle
    // string/number/bool cross-type loose comparisons for noisy KG data.
    match (as_f64(actual), as_f64(literal)) {
        (Some(a), Some(l)) => (a - l).abs() < 1e-9,
        _ => false,
    }
}

fn is_falsy(literal: &serde_json::Value) -> bool {
    matches!(
        literal,
        serde_json::Value::Bool(false) | serde_json::Value::Null
    ) || as_f64(literal) == Some(0.0)
}

fn as_f64(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// Evaluates a rule's full condition list under the given combinator.
pub fn evaluate_conditions(
    conditions: &[TriggerCondition],
    logic: TriggerLogic,
    snapshot: &serde_json::Value,
) -> Result<bool, ConditionError> {
    if conditions.is_empty() {
        return Ok(true);
    }
    Ok(match logic {
        TriggerLogic::And => conditions.iter().all(|c| evaluate_atom(c, snapshot)),
        TriggerLogic::Or => conditions.iter().any(|c| evaluate_atom(c, snapshot)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> serde_json::Value {
        serde_json::json!({
            "has_infrastructure_collapse": true,
            "magnitude": 6.5,
            "has_fire": false,
        })
    }

    fn eq(field: &str, literal: serde_json::Value) -> TriggerCondition {
        TriggerCondition { field: field.to_string(), op: ConditionOp::Eq, literal }
    }

    #[test]
    fn empty_conditions_trivially_match() {
        assert!(evaluate_conditions(&[], TriggerLogic::And, &snapshot()).unwrap());
    }

    #[test]
    fn missing_field_compares_falsy() {
        let cond = eq("has_secondary_fire", serde_json::json!(true));
        assert!(!evaluate_conditions(&[cond], TriggerLogic::And, &snapshot()).unwrap());
    }

    #[test]
    fn and_requires_all_atoms() {
        let conds = vec![
            eq("has_infrastructure_collapse", serde_json::json!(true)),
            eq("has_fire", serde_json::json!(true)),
        ];
        assert!(!evaluate_conditions(&conds, TriggerLogic::And, &snapshot()).unwrap());
    }

    #[test]
    fn or_requires_one_atom() {
        let conds = vec![
            eq("has_infrastructure_collapse", serde_json::json!(true)),
            eq("has_fire", serde_json::json!(true)),
        ];
        assert!(evaluate_conditions(&conds, TriggerLogic::Or, &snapshot()).unwrap());
    }

    #[test]
    fn gte_numeric_comparison() {
        let cond = TriggerCondition {
            field: "magnitude".to_string(),
            op: ConditionOp::Gte,
            literal: serde_json::json!(6.0),
        };
        assert!(evaluate_conditions(&[cond], TriggerLogic::And, &snapshot()).unwrap());
    }

    #[test]
    fn gt_numeric_comparison_excludes_equal_values() {
        let cond = TriggerCondition {
            field: "magnitude".to_string(),
            op: ConditionOp::Gt,
            literal: serde_json::json!(6.5),
        };
        assert!(!evaluate_conditions(&[cond], TriggerLogic::And, &snapshot()).unwrap());
    }
}
