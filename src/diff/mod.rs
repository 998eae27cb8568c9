//! Resource diff generation
//!
//! Computes the patch operations that turn one resource version into
//! another. The pipeline: align multi-valued lists by natural key, null out
//! empty collections, run the generic tree diff, then translate each delta
//! into a schema-aware patch operation, converting array indices into
//! natural-key value filters because positions are not stable identifiers
//! across the wire.

pub mod tree;

use std::collections::HashMap;

use log::debug;
use serde_json::{Map, Value};

use crate::ast::{CompareOp, FilterExpression, Literal};
use crate::error::Result;
use crate::evaluator::decimal_of;
use crate::patch::PatchOperation;
use crate::path::{AttributeReference, PatchPath};
use crate::resource::{get_field, get_field_mut, is_absent};
use crate::schema::{Attribute, ResourceType, Schema};
use tree::{DeltaKind, Segment, TreeDelta, diff_trees, natural_key};

/// Compute the operations that turn `original` into `updated`
///
/// Output order follows the structural-diff traversal and is deterministic
/// for a given pair of inputs; no sorting pass is applied.
pub fn generate(
    original: &Value,
    updated: &Value,
    resource_type: &ResourceType,
) -> Result<Vec<PatchOperation>> {
    let mut orig = original.clone();
    let mut upd = updated.clone();

    align_resources(&mut orig, &mut upd, resource_type);
    null_empty_arrays(&mut orig);
    null_empty_arrays(&mut upd);

    let deltas = diff_trees(&orig, &upd);
    let mut ctx = TranslationContext::default();
    let mut operations = Vec::new();
    for delta in deltas {
        operations.extend(translate(&delta, &orig, resource_type, &mut ctx)?);
    }
    Ok(operations)
}

// ---------------------------------------------------------------------------
// list alignment

/// Reorder every multi-valued attribute present on both sides so that
/// elements sharing a natural key come first, in the original's relative
/// order, followed by side-unique elements. This suppresses spurious
/// reorder artifacts from the positional tree diff.
fn align_resources(orig: &mut Value, upd: &mut Value, resource_type: &ResourceType) {
    align_containers(orig, upd, resource_type.base().attributes());

    for extension in resource_type.extensions() {
        let urn = extension.urn();
        let (Some(orig_ext), Some(upd_ext)) = (get_field_mut(orig, urn), get_field_mut(upd, urn))
        else {
            continue;
        };
        align_containers(orig_ext, upd_ext, extension.attributes());
    }
}

fn align_containers<'a>(
    orig: &mut Value,
    upd: &mut Value,
    attributes: impl Iterator<Item = &'a Attribute>,
) {
    for attribute in attributes {
        if attribute.is_multi_valued() {
            let both_arrays = get_field(orig, attribute.name()).is_some_and(Value::is_array)
                && get_field(upd, attribute.name()).is_some_and(Value::is_array);
            if !both_arrays {
                continue;
            }
            {
                let orig_list = get_field_mut(orig, attribute.name())
                    .and_then(Value::as_array_mut)
                    .expect("checked array");
                let upd_list = get_field_mut(upd, attribute.name())
                    .and_then(Value::as_array_mut)
                    .expect("checked array");
                align_lists(orig_list, upd_list);
            }
            if attribute.is_complex() {
                align_common_elements(orig, upd, attribute);
            }
        } else if attribute.is_complex() {
            let both_objects = get_field(orig, attribute.name()).is_some_and(Value::is_object)
                && get_field(upd, attribute.name()).is_some_and(Value::is_object);
            if both_objects {
                let orig_obj = get_field_mut(orig, attribute.name()).expect("checked object");
                let upd_obj = get_field_mut(upd, attribute.name()).expect("checked object");
                align_containers(orig_obj, upd_obj, attribute.sub_attributes());
            }
        }
    }
}

/// Recurse alignment into the key-matching element pairs of a multi-valued
/// complex attribute
fn align_common_elements(orig: &mut Value, upd: &mut Value, attribute: &Attribute) {
    let common = {
        let orig_list = get_field(orig, attribute.name())
            .and_then(Value::as_array)
            .expect("aligned array");
        let upd_list = get_field(upd, attribute.name())
            .and_then(Value::as_array)
            .expect("aligned array");
        let mut n = 0;
        while n < orig_list.len()
            && n < upd_list.len()
            && natural_key(&orig_list[n]) == natural_key(&upd_list[n])
        {
            n += 1;
        }
        n
    };
    for i in 0..common {
        let orig_elem = get_field_mut(orig, attribute.name())
            .and_then(Value::as_array_mut)
            .and_then(|l| l.get_mut(i))
            .expect("aligned element");
        let upd_elem = get_field_mut(upd, attribute.name())
            .and_then(Value::as_array_mut)
            .and_then(|l| l.get_mut(i))
            .expect("aligned element");
        align_containers(orig_elem, upd_elem, attribute.sub_attributes());
    }
}

/// Move key-sharing elements to the front of both lists, in the original's
/// relative order
fn align_lists(orig: &mut Vec<Value>, upd: &mut Vec<Value>) {
    let orig_keys: Vec<Value> = orig.iter().map(natural_key).collect();
    let upd_keys: Vec<Value> = upd.iter().map(natural_key).collect();

    // pair each original element with at most one updated element; exact
    // matches first so that key collisions pair the right elements
    let mut upd_taken = vec![false; upd.len()];
    let mut pairing: Vec<Option<usize>> = vec![None; orig.len()];
    for (i, element) in orig.iter().enumerate() {
        if let Some(j) = (0..upd.len()).find(|&j| !upd_taken[j] && upd[j] == *element) {
            upd_taken[j] = true;
            pairing[i] = Some(j);
        }
    }
    for i in 0..orig.len() {
        if pairing[i].is_none() {
            if let Some(j) = (0..upd.len()).find(|&j| !upd_taken[j] && upd_keys[j] == orig_keys[i])
            {
                upd_taken[j] = true;
                pairing[i] = Some(j);
            }
        }
    }

    let mut common_orig = Vec::new();
    let mut unique_orig = Vec::new();
    let mut common_upd = Vec::new();
    for (i, element) in orig.drain(..).enumerate() {
        match pairing[i] {
            Some(j) => {
                common_orig.push(element);
                common_upd.push(upd[j].clone());
            }
            None => unique_orig.push(element),
        }
    }

    let mut new_upd = common_upd;
    for (j, element) in upd.drain(..).enumerate() {
        if !upd_taken[j] {
            new_upd.push(element);
        }
    }

    *orig = common_orig;
    orig.append(&mut unique_orig);
    *upd = new_upd;
}

/// Empty collections are absent, not reorder targets; null them out before
/// diffing so the differ cannot emit spurious move artifacts against them
fn null_empty_arrays(value: &mut Value) {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                *value = Value::Null;
            } else {
                for item in items {
                    null_empty_arrays(item);
                }
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                null_empty_arrays(item);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// path translation

/// Per-diff-run translation state: the add/remove index offsets, keyed by
/// the pointer prefix of the collection they apply to. Never shared across
/// `generate` calls.
#[derive(Default)]
struct TranslationContext {
    offsets: HashMap<String, i64>,
}

fn translate(
    delta: &TreeDelta,
    original: &Value,
    resource_type: &ResourceType,
    ctx: &mut TranslationContext,
) -> Result<Vec<PatchOperation>> {
    let mut segments = delta.path.iter().peekable();

    let Some(Segment::Key(first)) = segments.next() else {
        debug!("skipping root-level delta: {delta}");
        return Ok(Vec::new());
    };

    let mut urn: Option<String> = None;
    let mut schema: &Schema = resource_type.base();
    let mut current_original: Option<&Value> = Some(original);
    let mut pointer = String::new();

    // extension prefix
    let attr_key = match resource_type.schema_for(Some(first.as_str())) {
        Some(ext) if ext.urn() != resource_type.base().urn() => {
            if segments.peek().is_none() {
                return Ok(translate_whole_extension(delta, ext));
            }
            urn = Some(ext.urn().to_string());
            schema = ext;
            current_original = current_original.and_then(|v| get_field(v, first));
            pointer.push('/');
            pointer.push_str(ext.urn());
            let Some(Segment::Key(key)) = segments.next() else {
                debug!("skipping extension delta with non-key segment: {delta}");
                return Ok(Vec::new());
            };
            key
        }
        _ => first,
    };

    let Some(attribute) = schema.attribute(attr_key) else {
        debug!("skipping delta for unknown attribute '{attr_key}': {delta}");
        return Ok(Vec::new());
    };
    pointer.push('/');
    pointer.push_str(attribute.name());
    current_original = current_original.and_then(|v| get_field(v, attr_key));

    let mut path = PatchPath::new(urn, Some(attribute.name().to_string()), None, None);
    let mut target_attribute = attribute;

    while let Some(segment) = segments.next() {
        match segment {
            Segment::Index(index) => {
                let offset = ctx.offsets.get(&pointer).copied().unwrap_or(0);
                let original_index = (*index as i64 + offset).max(0) as usize;
                let siblings = current_original.and_then(Value::as_array);
                let element = siblings.and_then(|l| l.get(original_index));
                let siblings = siblings.map(Vec::as_slice).unwrap_or_default();

                if segments.peek().is_none() {
                    return Ok(translate_element_op(delta, &path, element, siblings, &pointer, ctx));
                }

                // descending into a surviving element: identify it by key
                if let Some(element) = element {
                    if let Some(filter) = element_key_filter(element, siblings) {
                        path = path.with_filter(filter);
                    }
                    current_original = Some(element);
                } else {
                    current_original = None;
                }
                pointer.push('/');
                pointer.push_str(&index.to_string());
            }
            Segment::Key(key) => {
                let Some(sub) = target_attribute.sub_attribute(key) else {
                    debug!("skipping delta for unknown sub-attribute '{key}': {delta}");
                    return Ok(Vec::new());
                };
                path = path.with_sub_attribute(sub.name().to_string());
                current_original = current_original.and_then(|v| get_field(v, key));
                pointer.push('/');
                pointer.push_str(sub.name());
                target_attribute = sub;
            }
        }
    }

    Ok(finish_op(delta, path, attribute, current_original))
}

/// A changed extension present in only one version is one whole-extension
/// operation rather than per-field operations
fn translate_whole_extension(delta: &TreeDelta, extension: &Schema) -> Vec<PatchOperation> {
    match delta.kind {
        DeltaKind::Add => {
            let mut wrapper = Map::new();
            wrapper.insert(
                extension.urn().to_string(),
                delta.value.clone().unwrap_or(Value::Null),
            );
            vec![PatchOperation::add(None, Value::Object(wrapper))]
        }
        DeltaKind::Remove => {
            vec![PatchOperation::remove(PatchPath::extension(extension.urn()))]
        }
        DeltaKind::Replace => match &delta.value {
            Some(value) if !is_absent(value) => vec![PatchOperation::replace(
                Some(PatchPath::extension(extension.urn())),
                value.clone(),
            )],
            _ => vec![PatchOperation::remove(PatchPath::extension(extension.urn()))],
        },
    }
}

/// Delta ending on an array index: adds carry the new element, removes and
/// replaces identify the original element by its natural key
fn translate_element_op(
    delta: &TreeDelta,
    base_path: &PatchPath,
    element: Option<&Value>,
    siblings: &[Value],
    pointer: &str,
    ctx: &mut TranslationContext,
) -> Vec<PatchOperation> {
    match delta.kind {
        DeltaKind::Add => {
            *ctx.offsets.entry(pointer.to_string()).or_insert(0) -= 1;
            vec![PatchOperation::add(
                Some(base_path.clone()),
                delta.value.clone().unwrap_or(Value::Null),
            )]
        }
        DeltaKind::Remove => {
            *ctx.offsets.entry(pointer.to_string()).or_insert(0) += 1;
            let path = match element.and_then(|e| element_key_filter(e, siblings)) {
                Some(filter) => base_path.clone().with_filter(filter),
                None => base_path.clone(),
            };
            vec![PatchOperation::remove(path)]
        }
        DeltaKind::Replace => {
            let path = match element.and_then(|e| element_key_filter(e, siblings)) {
                Some(filter) => base_path.clone().with_filter(filter),
                None => base_path.clone(),
            };
            match &delta.value {
                Some(value) if !is_absent(value) => {
                    vec![PatchOperation::replace(Some(path), value.clone())]
                }
                _ => vec![PatchOperation::remove(path)],
            }
        }
    }
}

/// Build the final operation for a delta that ended on an attribute or
/// sub-attribute, applying the reclassification rules
fn finish_op(
    delta: &TreeDelta,
    path: PatchPath,
    attribute: &Attribute,
    original_value: Option<&Value>,
) -> Vec<PatchOperation> {
    let original_absent = original_value.is_none_or(is_absent);
    let whole_attribute = path.value_filter().is_none() && path.sub_attribute().is_none();

    match delta.kind {
        DeltaKind::Remove => {
            if original_absent {
                debug!("dropping remove of already-absent path '{path}'");
                return Vec::new();
            }
            vec![PatchOperation::remove(path)]
        }
        DeltaKind::Add | DeltaKind::Replace => {
            let value = delta.value.clone().unwrap_or(Value::Null);

            // an empty or null updated value means the attribute went away
            if is_absent(&value) {
                if original_absent {
                    return Vec::new();
                }
                debug!("reclassifying replace of '{path}' to remove: updated value is absent");
                return vec![PatchOperation::remove(path)];
            }

            // first elements of a previously empty collection: one add per
            // element, not one add of a wrapped array
            if attribute.is_multi_valued() && whole_attribute && original_absent {
                if let Value::Array(elements) = value {
                    return elements
                        .into_iter()
                        .map(|element| PatchOperation::add(Some(path.clone()), element))
                        .collect();
                }
            }

            if original_absent {
                vec![PatchOperation::add(Some(path), value)]
            } else {
                vec![PatchOperation::replace(Some(path), value)]
            }
        }
    }
}

/// The natural-key filter identifying one element of a multi-valued
/// attribute: `type eq ...` when the element has a type discriminator,
/// `value eq ...` otherwise, falling back to the first scalar field. A
/// discriminator shared with a sibling element is skipped: a filter built
/// from it would match more elements than the one it identifies.
fn element_key_filter(element: &Value, siblings: &[Value]) -> Option<FilterExpression> {
    if let Some(map) = element.as_object() {
        for name in ["type", "value"] {
            if let Some(filter) = discriminating_filter(map, name, siblings) {
                return Some(filter);
            }
        }
        return map
            .iter()
            .find_map(|(k, v)| literal_of(v).map(|lit| equality(k, lit)));
    }
    // scalar elements are addressed through the implicit "value"
    literal_of(element).map(|lit| equality("value", lit))
}

fn discriminating_filter(
    map: &Map<String, Value>,
    name: &str,
    siblings: &[Value],
) -> Option<FilterExpression> {
    let value = map
        .get(name)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v))?;
    let shared = siblings
        .iter()
        .filter(|s| s.as_object().and_then(|m| get_field_ci(m, name)) == Some(value))
        .count();
    if shared > 1 {
        return None;
    }
    literal_of(value).map(|lit| equality(name, lit))
}

fn get_field_ci<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v))
}

fn equality(attribute: &str, literal: Literal) -> FilterExpression {
    FilterExpression::compare(AttributeReference::of(attribute), CompareOp::Equal, literal)
}

fn literal_of(value: &Value) -> Option<Literal> {
    match value {
        Value::String(s) => Some(Literal::String(s.clone())),
        Value::Bool(b) => Some(Literal::Boolean(*b)),
        Value::Number(_) => decimal_of(value).map(Literal::Number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ENTERPRISE: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

    fn ops(original: Value, updated: Value) -> Vec<Value> {
        generate(&original, &updated, &ResourceType::user())
            .unwrap()
            .iter()
            .map(|op| serde_json::to_value(op).unwrap())
            .collect()
    }

    #[test]
    fn identical_resources_produce_no_operations() {
        let resource = json!({
            "userName": "jdoe",
            "name": {"givenName": "Jon"},
            "emails": [{"value": "a@x.com", "type": "work"}]
        });
        assert_eq!(ops(resource.clone(), resource), Vec::<Value>::new());
    }

    #[test]
    fn gained_singular_attribute_is_one_add() {
        assert_eq!(
            ops(json!({"userName": "jdoe"}), json!({"userName": "jdoe", "nickName": "Jon"})),
            vec![json!({"op": "add", "path": "nickName", "value": "Jon"})]
        );
    }

    #[test]
    fn lost_singular_attribute_is_one_remove() {
        assert_eq!(
            ops(json!({"userName": "jdoe", "nickName": "Jon"}), json!({"userName": "jdoe"})),
            vec![json!({"op": "remove", "path": "nickName"})]
        );
    }

    #[test]
    fn changed_singular_attribute_is_one_replace() {
        assert_eq!(
            ops(json!({"userName": "jdoe"}), json!({"userName": "jroe"})),
            vec![json!({"op": "replace", "path": "userName", "value": "jroe"})]
        );
    }

    #[test]
    fn first_elements_of_empty_collection_become_one_add_each() {
        let original = json!({"userName": "jdoe", "phoneNumbers": []});
        let updated = json!({
            "userName": "jdoe",
            "phoneNumbers": [{"value": "555-0100", "type": "mobile"}]
        });
        assert_eq!(
            ops(original, updated),
            vec![json!({
                "op": "add",
                "path": "phoneNumbers",
                "value": {"value": "555-0100", "type": "mobile"}
            })]
        );
    }

    #[test]
    fn dropped_element_is_a_natural_key_remove() {
        let original = json!({"emails": [
            {"value": "a@x.com", "type": "work"},
            {"value": "b@x.com", "type": "home"}
        ]});
        let updated = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        assert_eq!(
            ops(original, updated),
            vec![json!({"op": "remove", "path": "emails[type eq \"home\"]"})]
        );
    }

    #[test]
    fn consecutive_removes_resolve_through_the_index_offset() {
        let original = json!({"emails": [
            {"value": "a@x.com", "type": "work"},
            {"value": "b@x.com", "type": "home"},
            {"value": "c@x.com", "type": "other"}
        ]});
        let updated = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        assert_eq!(
            ops(original, updated),
            vec![
                json!({"op": "remove", "path": "emails[type eq \"home\"]"}),
                json!({"op": "remove", "path": "emails[type eq \"other\"]"}),
            ]
        );
    }

    #[test]
    fn changed_element_field_is_a_filtered_replace() {
        let original = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let updated = json!({"emails": [{"value": "x@y.com", "type": "work"}]});
        assert_eq!(
            ops(original, updated),
            vec![json!({
                "op": "replace",
                "path": "emails[type eq \"work\"].value",
                "value": "x@y.com"
            })]
        );
    }

    #[test]
    fn reordered_elements_produce_no_operations() {
        let original = json!({"emails": [
            {"value": "a@x.com", "type": "work"},
            {"value": "b@x.com", "type": "home"}
        ]});
        let updated = json!({"emails": [
            {"value": "b@x.com", "type": "home"},
            {"value": "a@x.com", "type": "work"}
        ]});
        assert_eq!(ops(original, updated), Vec::<Value>::new());
    }

    #[test]
    fn swapped_natural_key_splits_into_remove_and_add() {
        let original = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let updated = json!({"emails": [{"value": "a@x.com", "type": "home"}]});
        assert_eq!(
            ops(original, updated),
            vec![
                json!({"op": "remove", "path": "emails[type eq \"work\"]"}),
                json!({"op": "add", "path": "emails", "value": {"value": "a@x.com", "type": "home"}}),
            ]
        );
    }

    #[test]
    fn emptied_collection_is_one_remove() {
        let original = json!({"emails": [{"value": "a@x.com", "type": "work"}]});
        let updated = json!({"emails": []});
        assert_eq!(
            ops(original, updated),
            vec![json!({"op": "remove", "path": "emails"})]
        );
    }

    #[test]
    fn empty_collection_on_both_sides_is_not_a_change() {
        assert_eq!(
            ops(json!({"phoneNumbers": []}), json!({})),
            Vec::<Value>::new()
        );
    }

    #[test]
    fn nested_complex_change_targets_the_sub_attribute() {
        let original = json!({"name": {"givenName": "Jon", "familyName": "Doe"}});
        let updated = json!({"name": {"givenName": "Jon", "familyName": "Roe"}});
        assert_eq!(
            ops(original, updated),
            vec![json!({"op": "replace", "path": "name.familyName", "value": "Roe"})]
        );
    }

    #[test]
    fn new_extension_is_one_whole_extension_add() {
        let original = json!({"userName": "jdoe"});
        let updated = json!({
            "userName": "jdoe",
            ENTERPRISE: {"employeeNumber": "42"}
        });
        assert_eq!(
            ops(original, updated),
            vec![json!({
                "op": "add",
                "value": {ENTERPRISE: {"employeeNumber": "42"}}
            })]
        );
    }

    #[test]
    fn dropped_extension_is_one_whole_extension_remove() {
        let original = json!({
            "userName": "jdoe",
            ENTERPRISE: {"employeeNumber": "42"}
        });
        let updated = json!({"userName": "jdoe"});
        assert_eq!(
            ops(original, updated),
            vec![json!({"op": "remove", "path": ENTERPRISE})]
        );
    }

    #[test]
    fn changed_extension_attribute_is_urn_qualified() {
        let original = json!({ENTERPRISE: {"employeeNumber": "42"}});
        let updated = json!({ENTERPRISE: {"employeeNumber": "43"}});
        assert_eq!(
            ops(original, updated),
            vec![json!({
                "op": "replace",
                "path": format!("{ENTERPRISE}:employeeNumber"),
                "value": "43"
            })]
        );
    }

    #[test]
    fn unknown_attributes_are_skipped() {
        let original = json!({"favoriteColor": "blue"});
        let updated = json!({"favoriteColor": "green"});
        assert_eq!(ops(original, updated), Vec::<Value>::new());
    }

    #[test]
    fn shared_type_discriminator_falls_back_to_the_value_key() {
        let original = json!({"members": [
            {"value": "a1", "type": "User"},
            {"value": "b2", "type": "User"}
        ]});
        let updated = json!({"members": [{"value": "a1", "type": "User"}]});
        let operations = generate(&original, &updated, &ResourceType::group()).unwrap();
        assert_eq!(
            serde_json::to_value(&operations).unwrap(),
            json!([{"op": "remove", "path": "members[value eq \"b2\"]"}])
        );
    }

    #[test]
    fn key_collisions_pair_identical_elements_first() {
        let original = json!({"members": [
            {"value": "a1", "type": "User"},
            {"value": "b2", "type": "User"}
        ]});
        let updated = json!({"members": [{"value": "b2", "type": "User"}]});
        let operations = generate(&original, &updated, &ResourceType::group()).unwrap();
        assert_eq!(
            serde_json::to_value(&operations).unwrap(),
            json!([{"op": "remove", "path": "members[value eq \"a1\"]"}])
        );
    }

    #[test]
    fn scalar_collection_elements_use_the_implicit_value_key() {
        let original = json!({"schemas": ["urn:a", "urn:b"]});
        let updated = json!({"schemas": ["urn:a"]});
        assert_eq!(
            ops(original, updated),
            vec![json!({"op": "remove", "path": "schemas[value eq \"urn:b\"]"})]
        );
    }
}
