//! Schema-driven access to resource documents
//!
//! Resources are `serde_json::Value` object graphs shaped by the schema: one
//! field per attribute, arrays for multi-valued attributes, and one
//! URN-keyed sub-object per extension. Engine code never reads a field by
//! hard-coded name; everything goes through these case-insensitive accessors,
//! which is what lets one algorithm cover the base resource and every
//! registered extension.

use serde_json::{Map, Value};

/// Case-insensitive field lookup on a JSON object
pub fn get_field<'a>(obj: &'a Value, name: &str) -> Option<&'a Value> {
    let map = obj.as_object()?;
    map.get(name)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v))
}

/// Case-insensitive mutable field lookup on a JSON object
pub fn get_field_mut<'a>(obj: &'a mut Value, name: &str) -> Option<&'a mut Value> {
    let map = obj.as_object_mut()?;
    let key = actual_key(map, name)?;
    map.get_mut(&key)
}

/// The stored key matching `name` case-insensitively, when present
pub fn actual_key(map: &Map<String, Value>, name: &str) -> Option<String> {
    if map.contains_key(name) {
        return Some(name.to_string());
    }
    map.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

/// Set a field, replacing any case-variant of the same name
///
/// The declared attribute name wins over whatever casing the document used.
pub fn set_field(obj: &mut Value, name: &str, value: Value) {
    let Some(map) = obj.as_object_mut() else {
        return;
    };
    if let Some(key) = actual_key(map, name) {
        map.remove(&key);
    }
    map.insert(name.to_string(), value);
}

/// Remove a field by case-insensitive name; returns the removed value
pub fn remove_field(obj: &mut Value, name: &str) -> Option<Value> {
    let map = obj.as_object_mut()?;
    let key = actual_key(map, name)?;
    map.remove(&key)
}

/// The extension sub-object for a URN, when present
pub fn extension_object<'a>(resource: &'a Value, urn: &str) -> Option<&'a Value> {
    get_field(resource, urn).filter(|v| v.is_object())
}

/// Read an attribute value, routing through the extension object when the
/// owning schema is an extension
pub fn attribute_value<'a>(
    resource: &'a Value,
    extension_urn: Option<&str>,
    name: &str,
) -> Option<&'a Value> {
    match extension_urn {
        None => get_field(resource, name),
        Some(urn) => get_field(resource, urn).and_then(|ext| get_field(ext, name)),
    }
}

/// Mutable counterpart of [`attribute_value`]
pub fn attribute_value_mut<'a>(
    resource: &'a mut Value,
    extension_urn: Option<&str>,
    name: &str,
) -> Option<&'a mut Value> {
    match extension_urn {
        None => get_field_mut(resource, name),
        Some(urn) => get_field_mut(resource, urn).and_then(|ext| get_field_mut(ext, name)),
    }
}

/// Write an attribute value, creating the extension object on demand
pub fn set_attribute_value(
    resource: &mut Value,
    extension_urn: Option<&str>,
    name: &str,
    value: Value,
) {
    match extension_urn {
        None => set_field(resource, name, value),
        Some(urn) => {
            if get_field(resource, urn).is_none() {
                set_field(resource, urn, Value::Object(Map::new()));
            }
            if let Some(ext) = get_field_mut(resource, urn) {
                set_field(ext, name, value);
            }
        }
    }
}

/// Remove an attribute value; an extension object emptied by the removal is
/// removed as well
pub fn remove_attribute_value(
    resource: &mut Value,
    extension_urn: Option<&str>,
    name: &str,
) -> Option<Value> {
    match extension_urn {
        None => remove_field(resource, name),
        Some(urn) => {
            let removed = remove_field(get_field_mut(resource, urn)?, name);
            let emptied = get_field(resource, urn)
                .and_then(Value::as_object)
                .is_some_and(Map::is_empty);
            if emptied {
                remove_field(resource, urn);
            }
            removed
        }
    }
}

/// Whether a value counts as absent for presence and diff purposes
///
/// Null, empty arrays, empty objects and empty strings are all absent.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
