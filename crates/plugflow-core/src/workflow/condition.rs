//! Step condition evaluation against a [`WorkflowContext`].

use serde_json::Value;

use super::path;
use crate::models::{ConditionKind, LogicalOperator, StepCondition, WorkflowContext};

/// Evaluate `condition` against the serialized context.
///
/// Evaluation problems (unresolvable field, non-numeric comparison, unknown
/// type) yield `false` and are logged.
pub fn evaluate(condition: &StepCondition, context: &WorkflowContext) -> bool {
    match serde_json::to_value(context) {
        Ok(snapshot) => evaluate_against(condition, &snapshot),
        Err(e) => {
            tracing::warn!("[Condition] Failed to serialize context: {}", e);
            false
        }
    }
}

/// Evaluate `condition` against an already-serialized context.
pub fn evaluate_against(condition: &StepCondition, snapshot: &Value) -> bool {
    let base = evaluate_base(condition, snapshot);
    match condition.operator {
        None => base,
        Some(LogicalOperator::And) => {
            base && condition.conditions.iter().all(|c| evaluate_against(c, snapshot))
        }
        Some(LogicalOperator::Or) => {
            base || condition.conditions.iter().any(|c| evaluate_against(c, snapshot))
        }
        Some(LogicalOperator::Not) => {
            !(base && condition.conditions.iter().all(|c| evaluate_against(c, snapshot)))
        }
    }
}

fn evaluate_base(condition: &StepCondition, snapshot: &Value) -> bool {
    let field = path::lookup(snapshot, &condition.field).filter(|v| !v.is_null());

    match condition.kind {
        ConditionKind::Exists => return field.is_some(),
        ConditionKind::NotExists => return field.is_none(),
        ConditionKind::Unknown => {
            tracing::warn!(
                "[Condition] Unknown condition type on field {}",
                condition.field
            );
            return false;
        }
        _ => {}
    }

    let Some(actual) = field else {
        tracing::warn!(
            "[Condition] Field {} not found in context",
            condition.field
        );
        return false;
    };
    let expected = &condition.value;

    match condition.kind {
        ConditionKind::Equals => values_equal(actual, expected),
        ConditionKind::NotEquals => !values_equal(actual, expected),
        ConditionKind::Contains => contains(actual, expected),
        ConditionKind::GreaterThan | ConditionKind::LessThan => {
            match (as_number(actual), as_number(expected)) {
                (Some(a), Some(b)) if condition.kind == ConditionKind::GreaterThan => a > b,
                (Some(a), Some(b)) => a < b,
                _ => {
                    tracing::warn!(
                        "[Condition] Non-numeric comparison on {}: {} vs {}",
                        condition.field,
                        actual,
                        expected
                    );
                    false
                }
            }
        }
        ConditionKind::Exists | ConditionKind::NotExists | ConditionKind::Unknown => false,
    }
}

/// Numbers compare by value so `1` equals `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
        Value::String(s) => s.contains(&text_of(needle)),
        other => other.to_string().contains(&text_of(needle)),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
