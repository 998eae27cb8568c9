//! Patch application
//!
//! Executes a list of operations against a resource document, in list order.
//! Application is pure: the input is never mutated, a patched deep copy is
//! returned, and the first failing operation aborts the whole list so the
//! caller never observes a partially patched resource.

use serde_json::{Map, Value};

use crate::ast::FilterExpression;
use crate::error::{Result, ScimError};
use crate::evaluator;
use crate::path::PatchPath;
use crate::resource::{
    attribute_value, attribute_value_mut, get_field, is_absent, remove_attribute_value,
    remove_field, set_attribute_value, set_field,
};
use crate::schema::{Attribute, Mutability, ResourceType};

use super::{PatchOpKind, PatchOperation};

/// Apply patch operations to a resource, returning the patched copy
pub fn apply(
    resource: &Value,
    operations: &[PatchOperation],
    resource_type: &ResourceType,
) -> Result<Value> {
    let mut doc = resource.clone();
    for operation in operations {
        apply_one(&mut doc, operation, resource_type)?;
    }
    Ok(doc)
}

fn apply_one(
    doc: &mut Value,
    operation: &PatchOperation,
    resource_type: &ResourceType,
) -> Result<()> {
    let Some(path) = &operation.path else {
        return apply_pathless(doc, operation, resource_type);
    };
    match resolve(path, resource_type)? {
        Target::WholeExtension(urn) => apply_extension(doc, operation, path, &urn),
        Target::Attribute {
            extension_urn,
            attribute,
        } => {
            check_mutability(path, attribute)?;
            apply_attribute(doc, operation, path, extension_urn.as_deref(), attribute)
        }
    }
}

/// Expand a pathless operation into one operation per value entry
///
/// Keys are top-level attribute names or extension URNs. A pathless remove
/// has nothing to address and is rejected outright.
fn apply_pathless(
    doc: &mut Value,
    operation: &PatchOperation,
    resource_type: &ResourceType,
) -> Result<()> {
    if operation.op == PatchOpKind::Remove {
        return Err(ScimError::NoPath);
    }
    let value = required_value(operation)?;
    let Some(entries) = value.as_object() else {
        return Err(ScimError::invalid_value(
            "a pathless operation requires an object value",
        ));
    };

    for (key, entry) in entries {
        if key.eq_ignore_ascii_case(resource_type.base().urn()) {
            // base-URN-qualified entries are just top-level attributes
            let nested = PatchOperation {
                op: operation.op,
                path: None,
                value: Some(entry.clone()),
            };
            apply_pathless(doc, &nested, resource_type)?;
            continue;
        }
        let path = if resource_type.schema_for(Some(key)).is_some() {
            PatchPath::extension(key.clone())
        } else {
            PatchPath::parse(key).map_err(|_| ScimError::invalid_path(key.clone()))?
        };
        let expanded = PatchOperation {
            op: operation.op,
            path: Some(path),
            value: Some(entry.clone()),
        };
        apply_one(doc, &expanded, resource_type)?;
    }
    Ok(())
}

/// What a patch path addresses once resolved against the resource type
enum Target<'a> {
    /// A whole extension object, keyed by its canonical URN
    WholeExtension(String),
    /// One declared attribute, possibly inside an extension
    Attribute {
        extension_urn: Option<String>,
        attribute: &'a Attribute,
    },
}

fn resolve<'a>(path: &PatchPath, resource_type: &'a ResourceType) -> Result<Target<'a>> {
    let Some(name) = path.attribute_name() else {
        let urn = path.urn().unwrap_or_default();
        let schema = resource_type
            .schema_for(Some(urn))
            .ok_or_else(|| ScimError::invalid_path(path.to_string()))?;
        return Ok(Target::WholeExtension(schema.urn().to_string()));
    };

    let schema = match path.urn() {
        None => Some(resource_type.base()),
        Some(urn) => resource_type.schema_for(Some(urn)),
    };
    let Some(schema) = schema else {
        // a bare extension URN parses as urn + trailing attribute; when the
        // rejoined form names a registered schema the path addresses the
        // whole extension
        let urn = path.urn().unwrap_or_default();
        let joined = format!("{urn}:{name}");
        let ext = resource_type
            .schema_for(Some(&joined))
            .ok_or_else(|| ScimError::invalid_path(path.to_string()))?;
        if path.value_filter().is_some() || path.sub_attribute().is_some() {
            return Err(ScimError::invalid_path(path.to_string()));
        }
        return Ok(Target::WholeExtension(ext.urn().to_string()));
    };

    let attribute = schema
        .attribute(name)
        .ok_or_else(|| ScimError::invalid_path(path.to_string()))?;
    let extension_urn = if schema.urn().eq_ignore_ascii_case(resource_type.base().urn()) {
        None
    } else {
        Some(schema.urn().to_string())
    };
    Ok(Target::Attribute {
        extension_urn,
        attribute,
    })
}

fn check_mutability(path: &PatchPath, attribute: &Attribute) -> Result<()> {
    let forbidden = |a: &Attribute| {
        matches!(a.mutability(), Mutability::ReadOnly | Mutability::Immutable)
    };
    if forbidden(attribute) {
        return Err(ScimError::Mutability {
            attribute: attribute.name().to_string(),
            mutability: attribute.mutability().as_str().to_string(),
        });
    }
    if let Some(sub) = path.sub_attribute() {
        if let Some(sub_attr) = attribute.sub_attribute(sub) {
            if forbidden(sub_attr) {
                return Err(ScimError::Mutability {
                    attribute: format!("{}.{}", attribute.name(), sub_attr.name()),
                    mutability: sub_attr.mutability().as_str().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn apply_extension(
    doc: &mut Value,
    operation: &PatchOperation,
    path: &PatchPath,
    urn: &str,
) -> Result<()> {
    match operation.op {
        PatchOpKind::Remove => {
            if remove_field(doc, urn).is_none() {
                return Err(no_target(path));
            }
            Ok(())
        }
        PatchOpKind::Replace => {
            let value = required_value(operation)?;
            if !value.is_object() {
                return Err(ScimError::invalid_value(
                    "an extension value must be an object",
                ));
            }
            set_field(doc, urn, value.clone());
            Ok(())
        }
        PatchOpKind::Add => {
            let value = required_value(operation)?;
            let Some(entries) = value.as_object() else {
                return Err(ScimError::invalid_value(
                    "an extension value must be an object",
                ));
            };
            if get_field(doc, urn).is_none() {
                set_field(doc, urn, Value::Object(Map::new()));
            }
            if let Some(ext) = attribute_value_mut(doc, None, urn) {
                for (key, entry) in entries {
                    set_field(ext, key, entry.clone());
                }
            }
            Ok(())
        }
    }
}

fn apply_attribute(
    doc: &mut Value,
    operation: &PatchOperation,
    path: &PatchPath,
    ext: Option<&str>,
    attribute: &Attribute,
) -> Result<()> {
    if let Some(filter) = path.value_filter() {
        apply_filtered(doc, operation, path, ext, attribute, filter)?;
    } else if attribute.is_multi_valued() {
        apply_multi_valued(doc, operation, path, ext, attribute)?;
    } else if attribute.is_complex() {
        apply_singular_complex(doc, operation, path, ext, attribute)?;
    } else {
        apply_singular(doc, operation, path, ext, attribute)?;
    }
    if operation.op != PatchOpKind::Remove {
        check_primary_uniqueness(doc, ext, attribute)?;
    }
    Ok(())
}

fn apply_singular(
    doc: &mut Value,
    operation: &PatchOperation,
    path: &PatchPath,
    ext: Option<&str>,
    attribute: &Attribute,
) -> Result<()> {
    if path.sub_attribute().is_some() {
        return Err(ScimError::invalid_path(path.to_string()));
    }
    match operation.op {
        PatchOpKind::Remove => {
            if remove_attribute_value(doc, ext, attribute.name()).is_none() {
                return Err(no_target(path));
            }
            Ok(())
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            let value = required_value(operation)?;
            // skip equal writes to avoid version churn
            if attribute_value(doc, ext, attribute.name()) == Some(value) {
                return Ok(());
            }
            set_attribute_value(doc, ext, attribute.name(), value.clone());
            Ok(())
        }
    }
}

fn apply_singular_complex(
    doc: &mut Value,
    operation: &PatchOperation,
    path: &PatchPath,
    ext: Option<&str>,
    attribute: &Attribute,
) -> Result<()> {
    let Some(sub) = path.sub_attribute() else {
        return match operation.op {
            PatchOpKind::Remove => {
                if remove_attribute_value(doc, ext, attribute.name()).is_none() {
                    return Err(no_target(path));
                }
                Ok(())
            }
            PatchOpKind::Replace => {
                let value = required_value(operation)?;
                if !value.is_object() {
                    return Err(ScimError::invalid_value(format!(
                        "'{}' requires an object value",
                        attribute.name()
                    )));
                }
                set_attribute_value(doc, ext, attribute.name(), value.clone());
                Ok(())
            }
            PatchOpKind::Add => {
                let value = required_value(operation)?;
                let Some(entries) = value.as_object() else {
                    return Err(ScimError::invalid_value(format!(
                        "'{}' requires an object value",
                        attribute.name()
                    )));
                };
                if attribute_value(doc, ext, attribute.name()).is_none() {
                    set_attribute_value(doc, ext, attribute.name(), Value::Object(Map::new()));
                }
                if let Some(current) = attribute_value_mut(doc, ext, attribute.name()) {
                    merge_entries(current, entries, attribute);
                }
                Ok(())
            }
        };
    };

    let sub_attr = attribute
        .sub_attribute(sub)
        .ok_or_else(|| ScimError::invalid_path(path.to_string()))?;
    match operation.op {
        PatchOpKind::Remove => {
            let removed = attribute_value_mut(doc, ext, attribute.name())
                .and_then(|obj| remove_field(obj, sub_attr.name()));
            if removed.is_none() {
                return Err(no_target(path));
            }
            let emptied = attribute_value(doc, ext, attribute.name()).is_some_and(is_absent);
            if emptied {
                remove_attribute_value(doc, ext, attribute.name());
            }
            Ok(())
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            let value = required_value(operation)?;
            if attribute_value(doc, ext, attribute.name()).is_none() {
                set_attribute_value(doc, ext, attribute.name(), Value::Object(Map::new()));
            }
            if let Some(obj) = attribute_value_mut(doc, ext, attribute.name()) {
                set_field(obj, sub_attr.name(), value.clone());
            }
            Ok(())
        }
    }
}

fn apply_multi_valued(
    doc: &mut Value,
    operation: &PatchOperation,
    path: &PatchPath,
    ext: Option<&str>,
    attribute: &Attribute,
) -> Result<()> {
    let Some(sub) = path.sub_attribute() else {
        return match operation.op {
            PatchOpKind::Remove => {
                if remove_attribute_value(doc, ext, attribute.name()).is_none() {
                    return Err(no_target(path));
                }
                Ok(())
            }
            PatchOpKind::Replace => {
                let value = required_value(operation)?.clone();
                let list = match value {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                set_attribute_value(doc, ext, attribute.name(), Value::Array(list));
                Ok(())
            }
            PatchOpKind::Add => {
                let value = required_value(operation)?.clone();
                let incoming = match value {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                match attribute_value_mut(doc, ext, attribute.name()).and_then(Value::as_array_mut)
                {
                    Some(existing) => existing.extend(incoming),
                    None => set_attribute_value(doc, ext, attribute.name(), Value::Array(incoming)),
                }
                Ok(())
            }
        };
    };

    // a sub-attribute without a filter only makes sense against a sole element
    let sub_attr = attribute
        .sub_attribute(sub)
        .ok_or_else(|| ScimError::invalid_path(path.to_string()))?;
    let len = attribute_value(doc, ext, attribute.name())
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if len == 0 {
        return Err(no_target(path));
    }
    if len > 1 {
        return Err(ScimError::TooMany {
            path: path.to_string(),
        });
    }

    let element = attribute_value_mut(doc, ext, attribute.name())
        .and_then(Value::as_array_mut)
        .and_then(|list| list.first_mut())
        .ok_or_else(|| no_target(path))?;
    match operation.op {
        PatchOpKind::Remove => {
            if remove_field(element, sub_attr.name()).is_none() {
                return Err(no_target(path));
            }
            Ok(())
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            let value = required_value(operation)?;
            set_field(element, sub_attr.name(), value.clone());
            Ok(())
        }
    }
}

fn apply_filtered(
    doc: &mut Value,
    operation: &PatchOperation,
    path: &PatchPath,
    ext: Option<&str>,
    attribute: &Attribute,
    filter: &FilterExpression,
) -> Result<()> {
    if !attribute.is_multi_valued() {
        return Err(ScimError::invalid_path(path.to_string()));
    }
    let sub_attr = match path.sub_attribute() {
        Some(sub) => Some(
            attribute
                .sub_attribute(sub)
                .ok_or_else(|| ScimError::invalid_path(path.to_string()))?
                .name()
                .to_string(),
        ),
        None => None,
    };

    let mut list = attribute_value(doc, ext, attribute.name())
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut matched = Vec::new();
    for (i, element) in list.iter().enumerate() {
        if evaluator::evaluate_against_element(filter, attribute, element)? {
            matched.push(i);
        }
    }

    match operation.op {
        PatchOpKind::Remove => {
            if matched.is_empty() {
                return Err(no_target(path));
            }
            match &sub_attr {
                Some(sub) => {
                    let mut removed = false;
                    for &i in &matched {
                        removed |= remove_field(&mut list[i], sub).is_some();
                    }
                    // absent on every matched element is still an absent target
                    if !removed {
                        return Err(no_target(path));
                    }
                }
                None => {
                    let mut index = 0;
                    list.retain(|_| {
                        let keep = !matched.contains(&index);
                        index += 1;
                        keep
                    });
                }
            }
            if list.is_empty() {
                remove_attribute_value(doc, ext, attribute.name());
            } else {
                set_attribute_value(doc, ext, attribute.name(), Value::Array(list));
            }
            Ok(())
        }
        PatchOpKind::Add | PatchOpKind::Replace => {
            let value = required_value(operation)?;
            if matched.is_empty() {
                if operation.op == PatchOpKind::Add {
                    if let Some(element) =
                        synthesize_element(filter, attribute, sub_attr.as_deref(), value)
                    {
                        list.push(element);
                        set_attribute_value(doc, ext, attribute.name(), Value::Array(list));
                        return Ok(());
                    }
                }
                return Err(no_target(path));
            }
            for &i in &matched {
                update_element(&mut list[i], operation.op, sub_attr.as_deref(), value, attribute);
            }
            set_attribute_value(doc, ext, attribute.name(), Value::Array(list));
            Ok(())
        }
    }
}

/// Partial-update rule shared by the filtered and sole-element cases
fn update_element(
    element: &mut Value,
    op: PatchOpKind,
    sub_attr: Option<&str>,
    value: &Value,
    attribute: &Attribute,
) {
    match sub_attr {
        Some(sub) => set_field(element, sub, value.clone()),
        None => match (op, value.as_object()) {
            (PatchOpKind::Add, Some(entries)) if element.is_object() => {
                merge_entries(element, entries, attribute);
            }
            _ => *element = value.clone(),
        },
    }
}

/// Build a new element from an add on a filter that matched nothing
///
/// Only a simple equality filter can seed one; anything else has no single
/// value to start from.
fn synthesize_element(
    filter: &FilterExpression,
    attribute: &Attribute,
    sub_attr: Option<&str>,
    value: &Value,
) -> Option<Value> {
    let (reference, literal) = filter.as_simple_equality()?;
    if reference.sub_attribute().is_some() {
        return None;
    }
    let seed_name = attribute
        .sub_attribute(reference.attribute())
        .map_or_else(|| reference.attribute().to_string(), |a| a.name().to_string());

    let mut element = Map::new();
    element.insert(seed_name, literal.to_json());
    let mut element = Value::Object(element);
    match sub_attr {
        Some(sub) => set_field(&mut element, sub, value.clone()),
        None => {
            let entries = value.as_object()?;
            merge_entries(&mut element, entries, attribute);
        }
    }
    Some(element)
}

/// Merge object entries into a complex value, normalizing declared-attribute
/// key casing
fn merge_entries(target: &mut Value, entries: &Map<String, Value>, attribute: &Attribute) {
    for (key, entry) in entries {
        let name = attribute
            .sub_attribute(key)
            .map_or(key.as_str(), Attribute::name);
        set_field(target, name, entry.clone());
    }
}

fn check_primary_uniqueness(doc: &Value, ext: Option<&str>, attribute: &Attribute) -> Result<()> {
    if !attribute.is_multi_valued() {
        return Ok(());
    }
    let Some(list) = attribute_value(doc, ext, attribute.name()).and_then(Value::as_array) else {
        return Ok(());
    };
    let primaries = list
        .iter()
        .filter(|e| get_field(e, "primary").and_then(Value::as_bool) == Some(true))
        .count();
    if primaries > 1 {
        return Err(ScimError::Uniqueness {
            attribute: attribute.name().to_string(),
        });
    }
    Ok(())
}

fn required_value(operation: &PatchOperation) -> Result<&Value> {
    operation.value.as_ref().ok_or_else(|| {
        ScimError::invalid_value(format!(
            "{} operation requires a value",
            operation.op.as_str()
        ))
    })
}

fn no_target(path: &PatchPath) -> ScimError {
    ScimError::NoTarget {
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ENTERPRISE: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

    fn user() -> ResourceType {
        ResourceType::user()
    }

    fn op(json: Value) -> PatchOperation {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn replace_singular_attribute() {
        let resource = json!({"userName": "jdoe"});
        let patched = apply(
            &resource,
            &[op(json!({"op": "replace", "path": "userName", "value": "jroe"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched, json!({"userName": "jroe"}));
    }

    #[test]
    fn add_and_remove_singular_attribute() {
        let resource = json!({"userName": "jdoe"});
        let rt = user();

        let patched = apply(
            &resource,
            &[op(json!({"op": "add", "path": "nickName", "value": "Jon"}))],
            &rt,
        )
        .unwrap();
        assert_eq!(patched, json!({"userName": "jdoe", "nickName": "Jon"}));

        let patched = apply(
            &patched,
            &[op(json!({"op": "remove", "path": "nickName"}))],
            &rt,
        )
        .unwrap();
        assert_eq!(patched, resource);
    }

    #[test]
    fn remove_absent_attribute_is_no_target() {
        let err = apply(
            &json!({"userName": "jdoe"}),
            &[op(json!({"op": "remove", "path": "nickName"}))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::NoTarget { .. }));
    }

    #[test]
    fn remove_without_path_is_rejected() {
        let err = apply(
            &json!({"userName": "jdoe"}),
            &[op(json!({"op": "remove"}))],
            &user(),
        )
        .unwrap_err();
        assert_eq!(err, ScimError::NoPath);
    }

    #[test]
    fn pathless_replace_expands_per_entry() {
        let patched = apply(
            &json!({"userName": "jdoe"}),
            &[op(json!({
                "op": "replace",
                "value": {"nickName": "Jon", "displayName": "Jon Doe"}
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(
            patched,
            json!({"userName": "jdoe", "nickName": "Jon", "displayName": "Jon Doe"})
        );
    }

    #[test]
    fn pathless_with_scalar_value_is_invalid() {
        let err = apply(
            &json!({}),
            &[op(json!({"op": "replace", "value": "Jon"}))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::InvalidValue { .. }));
    }

    #[test]
    fn sub_attribute_of_singular_complex() {
        let resource = json!({"name": {"givenName": "Jon", "familyName": "Doe"}});
        let patched = apply(
            &resource,
            &[op(json!({"op": "replace", "path": "name.familyName", "value": "Roe"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched, json!({"name": {"givenName": "Jon", "familyName": "Roe"}}));
    }

    #[test]
    fn add_merges_into_singular_complex() {
        let resource = json!({"name": {"givenName": "Jon"}});
        let patched = apply(
            &resource,
            &[op(json!({"op": "add", "path": "name", "value": {"familyname": "Doe"}}))],
            &user(),
        )
        .unwrap();
        // declared casing wins over the value's casing
        assert_eq!(patched, json!({"name": {"givenName": "Jon", "familyName": "Doe"}}));
    }

    #[test]
    fn removing_last_sub_attribute_drops_the_object() {
        let resource = json!({"name": {"givenName": "Jon"}});
        let patched = apply(
            &resource,
            &[op(json!({"op": "remove", "path": "name.givenName"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched, json!({}));
    }

    #[test]
    fn add_appends_to_multi_valued() {
        let resource = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let patched = apply(
            &resource,
            &[op(json!({
                "op": "add",
                "path": "emails",
                "value": {"value": "b@x.com", "type": "home"}
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(
            patched["emails"],
            json!([
                {"value": "a@x.com", "type": "work"},
                {"value": "b@x.com", "type": "home"}
            ])
        );
    }

    #[test]
    fn replace_whole_multi_valued() {
        let resource = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let patched = apply(
            &resource,
            &[op(json!({
                "op": "replace",
                "path": "emails",
                "value": [{"value": "b@x.com", "type": "home"}]
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched["emails"], json!([{"value": "b@x.com", "type": "home"}]));
    }

    #[test]
    fn sole_element_sub_attribute_without_filter() {
        let resource = json!({"emails": [{"value": "a@x.com"}]});
        let patched = apply(
            &resource,
            &[op(json!({"op": "replace", "path": "emails.value", "value": "b@x.com"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched["emails"], json!([{"value": "b@x.com"}]));
    }

    #[test]
    fn unfiltered_sub_attribute_on_two_elements_is_too_many() {
        let resource = json!({"emails": [{"value": "a@x.com"}, {"value": "b@x.com"}]});
        let err = apply(
            &resource,
            &[op(json!({"op": "replace", "path": "emails.value", "value": "c@x.com"}))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::TooMany { .. }));
    }

    #[test]
    fn filtered_replace_touches_only_matching_element() {
        let resource = json!({"emails": [
            {"value": "a@x.com", "type": "work"},
            {"value": "b@x.com", "type": "home"}
        ]});
        let patched = apply(
            &resource,
            &[op(json!({
                "op": "replace",
                "path": "emails[type eq \"work\"].value",
                "value": "x@y.com"
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(
            patched["emails"],
            json!([
                {"value": "x@y.com", "type": "work"},
                {"value": "b@x.com", "type": "home"}
            ])
        );
    }

    #[test]
    fn filtered_remove_deletes_matching_elements() {
        let resource = json!({"emails": [
            {"value": "a@x.com", "type": "work"},
            {"value": "b@x.com", "type": "home"}
        ]});
        let patched = apply(
            &resource,
            &[op(json!({"op": "remove", "path": "emails[type eq \"home\"]"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched["emails"], json!([{"value": "a@x.com", "type": "work"}]));
    }

    #[test]
    fn filtered_remove_of_last_element_drops_the_attribute() {
        let resource = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let patched = apply(
            &resource,
            &[op(json!({"op": "remove", "path": "emails[type eq \"work\"]"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched, json!({}));
    }

    #[test]
    fn filtered_remove_with_no_match_is_no_target() {
        let resource = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let err = apply(
            &resource,
            &[op(json!({"op": "remove", "path": "emails[type eq \"other\"]"}))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::NoTarget { .. }));
    }

    #[test]
    fn filtered_remove_of_absent_sub_attribute_is_no_target() {
        let resource = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let err = apply(
            &resource,
            &[op(json!({"op": "remove", "path": "emails[type eq \"work\"].display"}))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::NoTarget { .. }));
    }

    #[test]
    fn filtered_remove_of_sub_attribute_present_on_one_match_succeeds() {
        let resource = json!({"emails": [
            {"value": "a@x.com", "type": "work", "display": "Work"},
            {"value": "b@x.com", "type": "work"}
        ]});
        let patched = apply(
            &resource,
            &[op(json!({"op": "remove", "path": "emails[type eq \"work\"].display"}))],
            &user(),
        )
        .unwrap();
        assert_eq!(
            patched["emails"],
            json!([
                {"value": "a@x.com", "type": "work"},
                {"value": "b@x.com", "type": "work"}
            ])
        );
    }

    #[test]
    fn filtered_add_with_no_match_synthesizes_element() {
        let resource = json!({"userName": "jdoe"});
        let patched = apply(
            &resource,
            &[op(json!({
                "op": "add",
                "path": "addresses[type eq \"local\"]",
                "value": {"locality": "Springfield"}
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(
            patched["addresses"],
            json!([{"type": "local", "locality": "Springfield"}])
        );
    }

    #[test]
    fn filtered_add_sub_attribute_with_no_match_synthesizes_element() {
        let resource = json!({});
        let patched = apply(
            &resource,
            &[op(json!({
                "op": "add",
                "path": "phoneNumbers[type eq \"mobile\"].value",
                "value": "555-0100"
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(
            patched["phoneNumbers"],
            json!([{"type": "mobile", "value": "555-0100"}])
        );
    }

    #[test]
    fn filtered_replace_with_no_match_is_no_target() {
        let err = apply(
            &json!({}),
            &[op(json!({
                "op": "replace",
                "path": "emails[type eq \"work\"].value",
                "value": "x@y.com"
            }))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::NoTarget { .. }));
    }

    #[test]
    fn second_primary_is_a_uniqueness_error() {
        let resource = json!({"emails": [
            {"value": "a@x.com", "type": "work", "primary": true},
            {"value": "b@x.com", "type": "home"}
        ]});
        let err = apply(
            &resource,
            &[op(json!({
                "op": "replace",
                "path": "emails[type eq \"home\"].primary",
                "value": true
            }))],
            &user(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScimError::Uniqueness {
                attribute: "emails".into()
            }
        );
    }

    #[test]
    fn read_only_attribute_is_rejected() {
        let err = apply(
            &json!({"id": "2819c223"}),
            &[op(json!({"op": "replace", "path": "id", "value": "other"}))],
            &user(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScimError::Mutability {
                attribute: "id".into(),
                mutability: "readOnly".into()
            }
        );
    }

    #[test]
    fn immutable_sub_attribute_is_rejected() {
        let err = apply(
            &json!({"members": [{"value": "abc"}]}),
            &[op(json!({
                "op": "replace",
                "path": "members[value eq \"abc\"].value",
                "value": "def"
            }))],
            &ResourceType::group(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::Mutability { .. }));
    }

    #[test]
    fn adding_group_members_is_allowed() {
        let patched = apply(
            &json!({"displayName": "Admins"}),
            &[op(json!({
                "op": "add",
                "path": "members",
                "value": [{"value": "abc", "type": "User"}]
            }))],
            &ResourceType::group(),
        )
        .unwrap();
        assert_eq!(patched["members"], json!([{"value": "abc", "type": "User"}]));
    }

    #[test]
    fn extension_attribute_via_urn_path() {
        let patched = apply(
            &json!({"userName": "jdoe"}),
            &[op(json!({
                "op": "add",
                "path": format!("{ENTERPRISE}:employeeNumber"),
                "value": "42"
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched[ENTERPRISE], json!({"employeeNumber": "42"}));
    }

    #[test]
    fn bare_urn_path_addresses_the_whole_extension() {
        let resource = json!({
            "userName": "jdoe",
            ENTERPRISE: {"employeeNumber": "42"}
        });
        let patched = apply(
            &resource,
            &[op(json!({"op": "remove", "path": ENTERPRISE}))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched, json!({"userName": "jdoe"}));
    }

    #[test]
    fn pathless_add_accepts_extension_urn_keys() {
        let patched = apply(
            &json!({"userName": "jdoe"}),
            &[op(json!({
                "op": "add",
                "value": {ENTERPRISE: {"department": "Tooling"}}
            }))],
            &user(),
        )
        .unwrap();
        assert_eq!(patched[ENTERPRISE], json!({"department": "Tooling"}));
    }

    #[test]
    fn unknown_attribute_path_is_invalid() {
        let err = apply(
            &json!({}),
            &[op(json!({"op": "add", "path": "favoriteColor", "value": "blue"}))],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::InvalidPath { .. }));
    }

    #[test]
    fn operations_apply_in_order_and_abort_on_failure() {
        let resource = json!({"userName": "jdoe"});
        let err = apply(
            &resource,
            &[
                op(json!({"op": "add", "path": "nickName", "value": "Jon"})),
                op(json!({"op": "remove", "path": "displayName"})),
            ],
            &user(),
        )
        .unwrap_err();
        assert!(matches!(err, ScimError::NoTarget { .. }));
        // input untouched despite the first operation having succeeded
        assert_eq!(resource, json!({"userName": "jdoe"}));
    }
}
