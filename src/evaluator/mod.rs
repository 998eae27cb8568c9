//! Filter expression evaluation
//!
//! Compiles a parsed [`FilterExpression`] against a [`ResourceType`] into a
//! [`Predicate`] and evaluates it over resource documents. Resolution is
//! deliberately lenient: an unknown attribute, or one whose return policy is
//! `never`, makes the sub-expression a non-match rather than an error. The
//! only evaluation-time error is an ordering operator applied to a type
//! without a total order.

use chrono::{DateTime, FixedOffset};
use log::trace;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::ast::{CompareOp, FilterExpression, Literal};
use crate::error::{Result, ScimError};
use crate::path::AttributeReference;
use crate::resource::{attribute_value, get_field, is_absent};
use crate::schema::{Attribute, AttributeType, ResourceType, Returned};

/// A filter expression compiled against one resource type
///
/// Owns its expression and schema metadata, so it can be handed to a
/// repository collaborator and evaluated against any number of resources.
#[derive(Debug, Clone)]
pub struct Predicate {
    expr: FilterExpression,
    resource_type: ResourceType,
}

impl Predicate {
    /// Evaluate against one resource document
    pub fn matches(&self, resource: &Value) -> Result<bool> {
        evaluate(&self.expr, &self.resource_type, resource)
    }

    /// The compiled expression
    pub fn expression(&self) -> &FilterExpression {
        &self.expr
    }
}

/// Compile an expression into a reusable predicate
pub fn compile(expr: &FilterExpression, resource_type: &ResourceType) -> Predicate {
    Predicate {
        expr: expr.clone(),
        resource_type: resource_type.clone(),
    }
}

/// Evaluate an expression against one resource document
pub fn evaluate(
    expr: &FilterExpression,
    resource_type: &ResourceType,
    resource: &Value,
) -> Result<bool> {
    eval(expr, &Container::Resource(resource_type), resource)
}

/// Evaluate an element-scoped filter against one element of a multi-valued
/// complex attribute (used by the patch engine for value-path filters)
pub fn evaluate_against_element(
    expr: &FilterExpression,
    attribute: &Attribute,
    element: &Value,
) -> Result<bool> {
    eval(expr, &Container::Complex(attribute), element)
}

/// The attribute namespace an expression is currently resolved against:
/// the resource's schemas at the top level, a complex attribute's
/// sub-attributes when descended into its elements.
enum Container<'a> {
    Resource(&'a ResourceType),
    Complex(&'a Attribute),
}

impl<'a> Container<'a> {
    /// Resolve a reference to its attribute and the value it names.
    ///
    /// Returns `None` (non-match) for unknown attributes, `never`-returned
    /// attributes, or URN-qualified references inside an element filter.
    fn resolve<'v>(
        &self,
        path: &AttributeReference,
        value: &'v Value,
    ) -> Option<(&'a Attribute, Option<&'v Value>)> {
        let (attribute, base) = match self {
            Container::Resource(resource_type) => {
                let schema = resource_type.schema_for(path.urn())?;
                let attribute = schema.attribute(path.attribute())?;
                let urn = (schema.urn() != resource_type.base().urn()).then(|| schema.urn());
                (attribute, attribute_value(value, urn, attribute.name()))
            }
            Container::Complex(parent) => {
                if path.urn().is_some() {
                    return None;
                }
                if !parent.is_complex() {
                    // elements of a multi-valued simple attribute are
                    // addressed through the implicit "value"
                    if path.attribute().eq_ignore_ascii_case("value") {
                        (*parent, Some(value))
                    } else {
                        return None;
                    }
                } else {
                    let attribute = parent.sub_attribute(path.attribute())?;
                    (attribute, get_field(value, attribute.name()))
                }
            }
        };
        if attribute.returned() == Returned::Never {
            trace!("attribute '{}' is never returned, treating as non-match", attribute.name());
            return None;
        }
        Some((attribute, base))
    }
}

fn eval(expr: &FilterExpression, container: &Container<'_>, value: &Value) -> Result<bool> {
    match expr {
        FilterExpression::Logical { op, left, right } => {
            let left_matches = eval(left, container, value)?;
            match op {
                crate::ast::LogicalOp::And if !left_matches => Ok(false),
                crate::ast::LogicalOp::Or if left_matches => Ok(true),
                _ => eval(right, container, value),
            }
        }
        FilterExpression::Group { inner, negate } => {
            let matches = eval(inner, container, value)?;
            Ok(if *negate { !matches } else { matches })
        }
        FilterExpression::Present { path } => Ok(eval_present(path, container, value)),
        FilterExpression::Compare { path, op, value: literal } => {
            eval_compare(path, *op, literal, container, value)
        }
        FilterExpression::ValuePath { path, filter } => {
            eval_value_path(path, filter.as_deref(), container, value)
        }
    }
}

fn eval_present(path: &AttributeReference, container: &Container<'_>, value: &Value) -> bool {
    let Some((attribute, base)) = container.resolve(path, value) else {
        return false;
    };
    let Some(base) = base else {
        return false;
    };
    match path.sub_attribute() {
        None => !is_absent(base),
        Some(sub) => {
            let Some(sub_attr) = attribute.sub_attribute(sub) else {
                return false;
            };
            if sub_attr.returned() == Returned::Never {
                return false;
            }
            elements_of(attribute, base)
                .iter()
                .filter_map(|element| get_field(element, sub_attr.name()))
                .any(|v| !is_absent(v))
        }
    }
}

fn eval_value_path(
    path: &AttributeReference,
    filter: Option<&FilterExpression>,
    container: &Container<'_>,
    value: &Value,
) -> Result<bool> {
    let Some((attribute, base)) = container.resolve(path, value) else {
        return Ok(false);
    };
    // value filters are restricted to multi-valued attributes
    if !attribute.is_multi_valued() {
        return Ok(false);
    }
    let Some(Value::Array(elements)) = base else {
        return Ok(false);
    };
    let Some(filter) = filter else {
        return Ok(!elements.is_empty());
    };
    for element in elements {
        if eval(filter, &Container::Complex(attribute), element)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn eval_compare(
    path: &AttributeReference,
    op: CompareOp,
    literal: &Literal,
    container: &Container<'_>,
    value: &Value,
) -> Result<bool> {
    let Some((attribute, base)) = container.resolve(path, value) else {
        return Ok(false);
    };

    // the attribute whose type and case rules drive the comparison
    let target = match path.sub_attribute() {
        None => attribute,
        Some(sub) => match attribute.sub_attribute(sub) {
            Some(sub_attr) if sub_attr.returned() != Returned::Never => sub_attr,
            _ => return Ok(false),
        },
    };

    // total order exists only for String, Number and Date
    if op.is_ordering()
        && matches!(
            target.value_type(),
            AttributeType::Boolean | AttributeType::Complex | AttributeType::Reference
        )
    {
        return Err(ScimError::UnsupportedFilterOperator {
            op: op.as_str().to_string(),
            value_type: target.value_type().as_str().to_string(),
        });
    }

    let candidates: Vec<&Value> = match base {
        None => Vec::new(),
        Some(base) => {
            let elements = elements_of(attribute, base);
            match path.sub_attribute() {
                None => elements,
                Some(_) => elements
                    .into_iter()
                    .filter_map(|element| get_field(element, target.name()))
                    .collect(),
            }
        }
    };

    // `eq null` is a presence test in disguise
    if matches!(literal, Literal::Null) {
        let present = candidates.iter().any(|v| !is_absent(v));
        return Ok(match op {
            CompareOp::Equal => !present,
            CompareOp::NotEqual => present,
            _ => false,
        });
    }

    for candidate in candidates {
        if compare_value(target, op, candidate, literal)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A multi-valued attribute's value fans out to its elements; anything else
/// is a single candidate.
fn elements_of<'a>(attribute: &Attribute, base: &'a Value) -> Vec<&'a Value> {
    match base {
        Value::Array(items) if attribute.is_multi_valued() => items.iter().collect(),
        _ => vec![base],
    }
}

fn compare_value(
    attribute: &Attribute,
    op: CompareOp,
    actual: &Value,
    literal: &Literal,
) -> Result<bool> {
    match attribute.value_type() {
        AttributeType::String | AttributeType::Reference => {
            let (Value::String(actual), Literal::String(expected)) = (actual, literal) else {
                return Ok(false);
            };
            Ok(compare_strings(op, actual, expected, attribute.is_case_exact()))
        }
        AttributeType::Boolean => {
            let (Value::Bool(actual), Literal::Boolean(expected)) = (actual, literal) else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Equal => actual == expected,
                CompareOp::NotEqual => actual != expected,
                _ => false,
            })
        }
        AttributeType::Number => {
            let (Some(actual), Literal::Number(expected)) = (decimal_of(actual), literal) else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Equal => actual == *expected,
                CompareOp::NotEqual => actual != *expected,
                CompareOp::GreaterThan => actual > *expected,
                CompareOp::GreaterThanOrEqual => actual >= *expected,
                CompareOp::LessThan => actual < *expected,
                CompareOp::LessThanOrEqual => actual <= *expected,
                // substring operators are string-only
                _ => false,
            })
        }
        AttributeType::Date => {
            let (Value::String(actual), Literal::String(expected)) = (actual, literal) else {
                return Ok(false);
            };
            match (parse_datetime(actual), parse_datetime(expected)) {
                (Some(actual), Some(expected)) => Ok(match op {
                    CompareOp::Equal => actual == expected,
                    CompareOp::NotEqual => actual != expected,
                    CompareOp::GreaterThan => actual > expected,
                    CompareOp::GreaterThanOrEqual => actual >= expected,
                    CompareOp::LessThan => actual < expected,
                    CompareOp::LessThanOrEqual => actual <= expected,
                    _ => false,
                }),
                // unparseable timestamps degrade to text comparison
                _ => Ok(compare_strings(op, actual, expected, attribute.is_case_exact())),
            }
        }
        AttributeType::Complex => Ok(false),
    }
}

fn compare_strings(op: CompareOp, actual: &str, expected: &str, case_exact: bool) -> bool {
    let (actual, expected) = if case_exact {
        (actual.to_string(), expected.to_string())
    } else {
        (actual.to_lowercase(), expected.to_lowercase())
    };
    match op {
        CompareOp::Equal => actual == expected,
        CompareOp::NotEqual => actual != expected,
        CompareOp::Contains => actual.contains(&expected),
        CompareOp::StartsWith => actual.starts_with(&expected),
        CompareOp::EndsWith => actual.ends_with(&expected),
        CompareOp::GreaterThan => actual > expected,
        CompareOp::GreaterThanOrEqual => actual >= expected,
        CompareOp::LessThan => actual < expected,
        CompareOp::LessThanOrEqual => actual <= expected,
    }
}

pub(crate) fn decimal_of(value: &Value) -> Option<Decimal> {
    let number = value.as_number()?;
    if let Some(i) = number.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = number.as_u64() {
        return Some(Decimal::from(u));
    }
    number.as_f64().and_then(Decimal::from_f64_retain)
}

fn parse_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}
