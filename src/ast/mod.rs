//! Filter expression AST
//!
//! Immutable expression trees produced by the parser (or the
//! [`FilterBuilder`]) and consumed by the evaluator and the patch engines.
//! Logical nodes are always binary; the parser left-folds operator chains
//! into nested binary nodes.

mod builder;

pub use builder::FilterBuilder;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::path::AttributeReference;

/// Comparison operator of an attribute comparison expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `eq` — equal
    Equal,
    /// `ne` — not equal
    NotEqual,
    /// `co` — contains (string)
    Contains,
    /// `sw` — starts with (string)
    StartsWith,
    /// `ew` — ends with (string)
    EndsWith,
    /// `gt` — greater than
    GreaterThan,
    /// `ge` — greater than or equal
    GreaterThanOrEqual,
    /// `lt` — less than
    LessThan,
    /// `le` — less than or equal
    LessThanOrEqual,
}

impl CompareOp {
    /// The operator keyword as it appears in filter text
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Equal => "eq",
            CompareOp::NotEqual => "ne",
            CompareOp::Contains => "co",
            CompareOp::StartsWith => "sw",
            CompareOp::EndsWith => "ew",
            CompareOp::GreaterThan => "gt",
            CompareOp::GreaterThanOrEqual => "ge",
            CompareOp::LessThan => "lt",
            CompareOp::LessThanOrEqual => "le",
        }
    }

    /// Parse an operator keyword (case-insensitive)
    pub fn from_keyword(s: &str) -> Option<CompareOp> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Equal),
            "ne" => Some(CompareOp::NotEqual),
            "co" => Some(CompareOp::Contains),
            "sw" => Some(CompareOp::StartsWith),
            "ew" => Some(CompareOp::EndsWith),
            "gt" => Some(CompareOp::GreaterThan),
            "ge" => Some(CompareOp::GreaterThanOrEqual),
            "lt" => Some(CompareOp::LessThan),
            "le" => Some(CompareOp::LessThanOrEqual),
            _ => None,
        }
    }

    /// Whether this operator requires a totally ordered value type
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::GreaterThan
                | CompareOp::GreaterThanOrEqual
                | CompareOp::LessThan
                | CompareOp::LessThanOrEqual
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical combinator of a binary logical expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Both operands must match
    And,
    /// Either operand must match
    Or,
}

impl LogicalOp {
    /// The combinator keyword as it appears in filter text
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

/// Literal value on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// JSON string literal
    String(String),
    /// JSON number literal
    Number(Decimal),
    /// JSON boolean literal
    Boolean(bool),
    /// JSON null literal
    Null,
}

impl Literal {
    /// Convert to the equivalent JSON value
    pub fn to_json(&self) -> serde_json::Value {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Literal::String(s) => serde_json::Value::String(s.clone()),
            Literal::Number(n) => {
                if n.is_integer() {
                    if let Some(i) = n.to_i64() {
                        return serde_json::Value::Number(i.into());
                    }
                }
                n.to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
            Literal::Boolean(b) => serde_json::Value::Bool(*b),
            Literal::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // JSON string escaping, exactly what the filter grammar expects
            Literal::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// One node of a filter expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpression {
    /// Attribute comparison, e.g. `userName eq "jdoe"`
    Compare {
        /// Attribute being compared
        path: AttributeReference,
        /// Comparison operator
        op: CompareOp,
        /// Right-hand literal
        value: Literal,
    },

    /// Attribute presence test, e.g. `title pr`
    Present {
        /// Attribute being tested
        path: AttributeReference,
    },

    /// Binary logical combination, e.g. `a eq 1 and b eq 2`
    Logical {
        /// Combinator
        op: LogicalOp,
        /// Left operand
        left: Box<FilterExpression>,
        /// Right operand
        right: Box<FilterExpression>,
    },

    /// Parenthesized group, optionally negated, e.g. `not (a pr)`
    Group {
        /// Grouped expression
        inner: Box<FilterExpression>,
        /// Whether the group is negated
        negate: bool,
    },

    /// Value-path filter over a multi-valued attribute,
    /// e.g. `emails[type eq "work"]`
    ValuePath {
        /// The multi-valued attribute being filtered
        path: AttributeReference,
        /// Filter evaluated against each element; `None` addresses the
        /// attribute itself (only produced by patch paths)
        filter: Option<Box<FilterExpression>>,
    },
}

impl FilterExpression {
    /// Shorthand for a comparison node
    pub fn compare(path: AttributeReference, op: CompareOp, value: Literal) -> Self {
        FilterExpression::Compare { path, op, value }
    }

    /// Shorthand for a presence node
    pub fn present(path: AttributeReference) -> Self {
        FilterExpression::Present { path }
    }

    /// Shorthand for a group node
    pub fn group(inner: FilterExpression, negate: bool) -> Self {
        FilterExpression::Group {
            inner: Box::new(inner),
            negate,
        }
    }

    /// Whether this node is a logical combination
    pub fn is_logical(&self) -> bool {
        matches!(self, FilterExpression::Logical { .. })
    }

    /// The comparison `(path, value)` when this is a simple equality test
    ///
    /// Used by the patch applicator to seed a new element from an `ADD` on a
    /// filtered path with no matching element.
    pub fn as_simple_equality(&self) -> Option<(&AttributeReference, &Literal)> {
        match self {
            FilterExpression::Compare {
                path,
                op: CompareOp::Equal,
                value,
            } => Some((path, value)),
            _ => None,
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Compare { path, op, value } => {
                write!(f, "{path} {op} {value}")
            }
            FilterExpression::Present { path } => write!(f, "{path} pr"),
            FilterExpression::Logical { op, left, right } => {
                write!(f, "{left} {} {right}", op.as_str())
            }
            FilterExpression::Group { inner, negate } => {
                if *negate {
                    write!(f, "not ({inner})")
                } else {
                    write!(f, "({inner})")
                }
            }
            FilterExpression::ValuePath { path, filter } => match filter {
                Some(filter) => write!(f, "{path}[{filter}]"),
                None => write!(f, "{path}"),
            },
        }
    }
}
