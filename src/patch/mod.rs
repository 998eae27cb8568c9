//! Patch operations
//!
//! The wire-level operation model (`{ "op": ..., "path": ..., "value": ... }`)
//! and the applicator that executes a list of operations against a resource
//! document.

mod apply;

pub use apply::apply;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::PatchPath;

/// Patch verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    /// Add a value (appends to multi-valued attributes)
    #[serde(alias = "Add", alias = "ADD")]
    Add,
    /// Replace a value
    #[serde(alias = "Replace", alias = "REPLACE")]
    Replace,
    /// Remove a value
    #[serde(alias = "Remove", alias = "REMOVE")]
    Remove,
}

impl PatchOpKind {
    /// Lowercase verb as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOpKind::Add => "add",
            PatchOpKind::Replace => "replace",
            PatchOpKind::Remove => "remove",
        }
    }
}

/// One patch operation
///
/// `path` is omitted only when `value` is an object whose keys are top-level
/// attribute names (or extension URNs); such a composite operation is
/// expanded into one operation per entry before application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// The verb
    pub op: PatchOpKind,
    /// Target path, textual on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PatchPath>,
    /// New value; never present for removes produced by the diff generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Build an add operation
    pub fn add(path: Option<PatchPath>, value: Value) -> Self {
        PatchOperation {
            op: PatchOpKind::Add,
            path,
            value: Some(value),
        }
    }

    /// Build a replace operation
    pub fn replace(path: Option<PatchPath>, value: Value) -> Self {
        PatchOperation {
            op: PatchOpKind::Replace,
            path,
            value: Some(value),
        }
    }

    /// Build a remove operation
    pub fn remove(path: PatchPath) -> Self {
        PatchOperation {
            op: PatchOpKind::Remove,
            path: Some(path),
            value: None,
        }
    }

    /// Textual form of the path, when present
    pub fn path_string(&self) -> Option<String> {
        self.path.as_ref().map(ToString::to_string)
    }
}
