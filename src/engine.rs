//! Update orchestration
//!
//! [`UpdateEngine`] is the repository-facing entry point tying the filter,
//! diff and patch subsystems together for one resource type. It is stateless
//! between calls and never retains references to the resources it is given,
//! so one engine can serve concurrent requests as long as each call brings
//! its own documents.

use serde_json::Value;

use crate::ast::FilterExpression;
use crate::diff;
use crate::error::Result;
use crate::evaluator::{self, Predicate};
use crate::parser;
use crate::patch::{self, PatchOperation};
use crate::schema::ResourceType;

/// How an update request arrives from the transport layer
#[derive(Debug, Clone)]
pub enum UpdateRequest {
    /// A full replacement document; the operations are computed by diffing
    Replacement(Value),
    /// An explicit operation list from a patch request
    Operations(Vec<PatchOperation>),
}

/// The result of one update: the patched resource and the operations that
/// produced it (computed for replacements, echoed for patch requests)
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// The new resource state
    pub resource: Value,
    /// The operations applied to reach it
    pub operations: Vec<PatchOperation>,
}

/// Filter, diff and patch facade for one resource type
#[derive(Debug, Clone)]
pub struct UpdateEngine {
    resource_type: ResourceType,
}

impl UpdateEngine {
    /// Build an engine for a resource type
    pub fn new(resource_type: ResourceType) -> Self {
        UpdateEngine { resource_type }
    }

    /// The resource type this engine serves
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Parse a textual filter
    pub fn parse_filter(&self, text: &str) -> Result<FilterExpression> {
        Ok(parser::parse_filter(text)?)
    }

    /// Compile a filter expression into a reusable predicate
    pub fn compile_predicate(&self, expr: &FilterExpression) -> Predicate {
        evaluator::compile(expr, &self.resource_type)
    }

    /// Compute the operations that turn `original` into `updated`
    pub fn diff(&self, original: &Value, updated: &Value) -> Result<Vec<PatchOperation>> {
        diff::generate(original, updated, &self.resource_type)
    }

    /// Apply operations to a resource, returning the patched copy
    pub fn apply(&self, resource: &Value, operations: &[PatchOperation]) -> Result<Value> {
        patch::apply(resource, operations, &self.resource_type)
    }

    /// Execute one update request against the current resource state
    pub fn update(&self, original: &Value, request: UpdateRequest) -> Result<UpdateOutcome> {
        let operations = match request {
            UpdateRequest::Replacement(updated) => self.diff(original, &updated)?,
            UpdateRequest::Operations(operations) => operations,
        };
        let resource = self.apply(original, &operations)?;
        Ok(UpdateOutcome {
            resource,
            operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine() -> UpdateEngine {
        UpdateEngine::new(ResourceType::user())
    }

    #[test]
    fn replacement_update_converges_on_the_new_state() {
        let original = json!({
            "userName": "jdoe",
            "emails": [{"value": "a@x.com", "type": "work"}]
        });
        let updated = json!({
            "userName": "jdoe",
            "nickName": "Jon",
            "emails": [{"value": "x@y.com", "type": "work"}]
        });
        let outcome = engine()
            .update(&original, UpdateRequest::Replacement(updated.clone()))
            .unwrap();
        assert_eq!(outcome.resource, updated);
        assert_eq!(outcome.operations.len(), 2);
    }

    #[test]
    fn replacement_with_no_changes_is_a_no_op() {
        let resource = json!({"userName": "jdoe"});
        let outcome = engine()
            .update(&resource, UpdateRequest::Replacement(resource.clone()))
            .unwrap();
        assert!(outcome.operations.is_empty());
        assert_eq!(outcome.resource, resource);
    }

    #[test]
    fn operations_update_applies_the_given_list() {
        let original = json!({"userName": "jdoe"});
        let operations = vec![PatchOperation::add(
            Some("nickName".parse().unwrap()),
            json!("Jon"),
        )];
        let outcome = engine()
            .update(&original, UpdateRequest::Operations(operations))
            .unwrap();
        assert_eq!(outcome.resource, json!({"userName": "jdoe", "nickName": "Jon"}));
    }

    #[test]
    fn parsed_filter_compiles_into_a_working_predicate() {
        let engine = engine();
        let expr = engine
            .parse_filter("userName eq \"jdoe\" and emails[type eq \"work\"]")
            .unwrap();
        let predicate = engine.compile_predicate(&expr);

        let matching = json!({
            "userName": "JDOE",
            "emails": [{"value": "a@x.com", "type": "work"}]
        });
        let other = json!({"userName": "jdoe"});
        assert!(predicate.matches(&matching).unwrap());
        assert!(!predicate.matches(&other).unwrap());
    }
}
