//! Document mutation rules shared by the bundled store adapters.

use serde_json::{Map, Value};

use super::{FieldOp, StoreError};

/// Compute the document stored after a `set_document` call.
pub(crate) fn apply_set(existing: Option<Value>, document: Value, merge: bool) -> Value {
    match (existing, document, merge) {
        (Some(Value::Object(mut current)), Value::Object(incoming), true) => {
            for (field, value) in incoming {
                current.insert(field, value);
            }
            Value::Object(current)
        }
        (_, document, _) => document,
    }
}

/// Apply an array mutation in place.
///
/// Missing intermediate objects and a missing target field are created;
/// a target that exists but is not an array is an error.
pub(crate) fn apply_field_op(
    document: &mut Value,
    field_path: &str,
    op: FieldOp,
    value: Value,
) -> Result<(), StoreError> {
    let segments: Vec<&str> = field_path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidFieldPath(field_path.to_string()));
    }

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| StoreError::InvalidFieldPath(field_path.to_string()))?;

    let mut current = as_object_mut(document, field_path)?;
    for segment in parents {
        let child = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = as_object_mut(child, field_path)?;
    }

    let target = current
        .entry(last.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = target else {
        return Err(StoreError::InvalidFieldPath(format!(
            "{field_path} is not an array"
        )));
    };

    match op {
        FieldOp::ArrayUnion => {
            if !items.contains(&value) {
                items.push(value);
            }
        }
        FieldOp::ArrayRemove => items.retain(|item| item != &value),
    }
    Ok(())
}

fn as_object_mut<'a>(
    value: &'a mut Value,
    field_path: &str,
) -> Result<&'a mut Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidFieldPath(format!(
            "{field_path} traverses a non-object value"
        ))),
    }
}
