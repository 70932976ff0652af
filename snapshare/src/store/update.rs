use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::StoreError;

/// A single field-level write applied to an existing document.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set { field: String, value: Value },
    Remove { field: String },
    /// Appends each value not already present, preserving order.
    ArrayUnion { field: String, values: Vec<Value> },
    /// Removes every element equal to one of the values.
    ArrayRemove { field: String, values: Vec<Value> },
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn set_serialized<T: Serialize>(field: impl Into<String>, value: &T) -> Result<Self, StoreError> {
        Ok(Self::Set {
            field: field.into(),
            value: serde_json::to_value(value)?,
        })
    }

    pub fn remove(field: impl Into<String>) -> Self {
        Self::Remove { field: field.into() }
    }

    pub fn array_union(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayUnion {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn array_remove(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayRemove {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldUpdate::Set { field, .. }
            | FieldUpdate::Remove { field }
            | FieldUpdate::ArrayUnion { field, .. }
            | FieldUpdate::ArrayRemove { field, .. } => field,
        }
    }
}

/// Applies updates in order to a JSON object document.
///
/// Field names are dotted paths: `unreadCounts.u1` addresses key `u1` of the
/// `unreadCounts` map. Writes create missing or non-object intermediate maps;
/// removals through a missing map are no-ops. A union or removal on a missing
/// or non-array field replaces it with an array.
pub fn apply_updates(document: &mut Value, updates: &[FieldUpdate]) -> Result<(), StoreError> {
    let fields: &mut Map<String, Value> = document.as_object_mut().ok_or_else(|| StoreError::Other {
        message: "cannot update a non-object document".into(),
    })?;

    for update in updates {
        match update {
            FieldUpdate::Set { field, value } => {
                let (parent, key) = parent_mut(fields, field)?;
                parent.insert(key.to_string(), value.clone());
            }
            FieldUpdate::Remove { field } => {
                if let Some((parent, key)) = existing_parent_mut(fields, field) {
                    parent.remove(key);
                }
            }
            FieldUpdate::ArrayUnion { field, values } => {
                let (parent, key) = parent_mut(fields, field)?;
                let mut items = take_array(parent, key);
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
                parent.insert(key.to_string(), Value::Array(items));
            }
            FieldUpdate::ArrayRemove { field, values } => {
                let (parent, key) = parent_mut(fields, field)?;
                let mut items = take_array(parent, key);
                items.retain(|item| !values.contains(item));
                parent.insert(key.to_string(), Value::Array(items));
            }
        }
    }
    Ok(())
}

/// Walks to the map holding the last path segment, creating maps on the way.
fn parent_mut<'a, 'p>(
    fields: &'a mut Map<String, Value>,
    path: &'p str,
) -> Result<(&'a mut Map<String, Value>, &'p str), StoreError> {
    let (parents, key) = split_path(path);
    let mut current = fields;
    for segment in parents {
        if !current.get(segment).is_some_and(Value::is_object) {
            current.insert(segment.to_string(), Value::Object(Map::new()));
        }
        current = match current.get_mut(segment) {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(StoreError::Other {
                    message: format!("cannot resolve field path '{path}'").into(),
                });
            }
        };
    }
    Ok((current, key))
}

fn existing_parent_mut<'a, 'p>(
    fields: &'a mut Map<String, Value>,
    path: &'p str,
) -> Option<(&'a mut Map<String, Value>, &'p str)> {
    let (parents, key) = split_path(path);
    let mut current = fields;
    for segment in parents {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    Some((current, key))
}

fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let key = segments.pop().unwrap_or(path);
    (segments, key)
}

fn take_array(fields: &mut Map<String, Value>, field: &str) -> Vec<Value> {
    match fields.remove(field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
