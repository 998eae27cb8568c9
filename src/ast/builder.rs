//! Construction DSL for filter expressions
//!
//! Combines expressions with `and`/`or` without going through filter text.
//! Operands that are themselves logical nodes are wrapped in a group first,
//! so the built tree re-serializes with the precedence the caller composed,
//! not the precedence the parser would infer.

use crate::ast::{FilterExpression, LogicalOp};
use crate::error::{Result, ScimError};

/// Incremental filter expression builder
///
/// The one-argument [`and`](FilterBuilder::and)/[`or`](FilterBuilder::or)
/// calls chain onto the previously built expression and fail on an empty
/// builder; the two-argument [`and_of`](FilterBuilder::and_of)/
/// [`or_of`](FilterBuilder::or_of) constructors need no prior state.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    current: Option<FilterExpression>,
}

impl FilterBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded with an expression
    pub fn from_expression(expr: FilterExpression) -> Self {
        FilterBuilder {
            current: Some(wrap_logical(expr)),
        }
    }

    /// Combine two expressions with `and`
    pub fn and_of(left: FilterExpression, right: FilterExpression) -> Self {
        FilterBuilder {
            current: Some(combine(LogicalOp::And, wrap_logical(left), right)),
        }
    }

    /// Combine two expressions with `or`
    pub fn or_of(left: FilterExpression, right: FilterExpression) -> Self {
        FilterBuilder {
            current: Some(combine(LogicalOp::Or, wrap_logical(left), right)),
        }
    }

    /// Chain `and <operand>` onto the built expression
    ///
    /// Fails when nothing has been built yet: unary chaining requires
    /// pre-existing state.
    pub fn and(self, operand: FilterExpression) -> Result<Self> {
        self.chain(LogicalOp::And, operand)
    }

    /// Chain `or <operand>` onto the built expression
    ///
    /// Fails when nothing has been built yet: unary chaining requires
    /// pre-existing state.
    pub fn or(self, operand: FilterExpression) -> Result<Self> {
        self.chain(LogicalOp::Or, operand)
    }

    fn chain(self, op: LogicalOp, operand: FilterExpression) -> Result<Self> {
        let Some(current) = self.current else {
            return Err(ScimError::FilterBuilder {
                message: format!("cannot chain '{}' onto an empty builder", op.as_str()),
            });
        };
        Ok(FilterBuilder {
            current: Some(combine(op, current, operand)),
        })
    }

    /// Finish building, failing on an empty builder
    pub fn build(self) -> Result<FilterExpression> {
        self.current.ok_or(ScimError::FilterBuilder {
            message: "no expression has been built".into(),
        })
    }
}

fn combine(op: LogicalOp, left: FilterExpression, right: FilterExpression) -> FilterExpression {
    FilterExpression::Logical {
        op,
        left: Box::new(left),
        right: Box::new(wrap_logical(right)),
    }
}

/// Wrap logical operands in a non-negating group to preserve precedence
/// when the tree is re-serialized to text
fn wrap_logical(expr: FilterExpression) -> FilterExpression {
    if expr.is_logical() {
        FilterExpression::group(expr, false)
    } else {
        expr
    }
}
