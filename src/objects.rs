//! Value predicates and object-shape filtering

use serde_json::Value;

use crate::query::DataObject;

/// Null, empty string, empty array or empty object
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Keep only the keys listed in `allowed`
///
/// Unknown keys are dropped silently. Filtering is idempotent.
pub fn object_cleanup(data: &DataObject, allowed: &[String]) -> DataObject {
    data.iter()
        .filter(|(key, _)| allowed.iter().any(|a| a == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
