//! SCIM filter evaluation and resource diff/patch in Rust
//!
//! A schema-aware implementation of the SCIM (RFC 7643/7644) data
//! transformation core: filter parsing and predicate evaluation, patch path
//! addressing, resource diffing with natural-key element identity, and patch
//! application.

pub mod ast;
pub mod diff;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod patch;
pub mod path;
pub mod resource;
pub mod schema;

// Re-export main types
pub use ast::{CompareOp, FilterBuilder, FilterExpression, Literal, LogicalOp};
pub use engine::{UpdateEngine, UpdateOutcome, UpdateRequest};
pub use error::{Result, ScimError};
pub use evaluator::{Predicate, compile, evaluate};
pub use parser::{ParseError, parse_filter, parse_path};
pub use patch::{PatchOpKind, PatchOperation, apply};
pub use path::{AttributeReference, PatchPath};
pub use schema::{
    Attribute, AttributeType, Mutability, ResourceType, Returned, Schema, SchemaRegistry,
};

pub use diff::generate as diff;
