//! Placeholder helpers for key-value update and query expressions.
//!
//! Field `plan` is referenced as `#plan` in expressions and its value as
//! `:plan`, so the name and value maps can be derived from the field list.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Parameters for an update-item call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateParams {
    pub update_expression: String,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: HashMap<String, Value>,
}

/// `["plan", "status"]` becomes `{"#plan": "plan", "#status": "status"}`.
pub fn prepare_attribute_names<I, S>(fields: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| {
            let f = f.as_ref();
            (format!("#{f}"), f.to_string())
        })
        .collect()
}

/// `{"plan": "free1"}` becomes `{":plan": "free1"}`.
#[must_use]
pub fn prepare_attribute_values(values: &Map<String, Value>) -> HashMap<String, Value> {
    values
        .iter()
        .map(|(k, v)| (format!(":{k}"), v.clone()))
        .collect()
}

/// `["plan", "status"]` becomes `SET #plan = :plan, #status = :status`.
pub fn prepare_update_expression<I, S>(keys: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let assignments: Vec<String> = keys
        .into_iter()
        .map(|k| {
            let k = k.as_ref();
            format!("#{k} = :{k}")
        })
        .collect();
    format!("SET {}", assignments.join(", "))
}

/// Expression, names and values for setting every field of `updates`.
///
/// Assignments appear in the map's key order.
#[must_use]
pub fn prepare_update(updates: &Map<String, Value>) -> UpdateParams {
    UpdateParams {
        update_expression: prepare_update_expression(updates.keys()),
        expression_attribute_names: prepare_attribute_names(updates.keys()),
        expression_attribute_values: prepare_attribute_values(updates),
    }
}
