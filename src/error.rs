//! Error types for SCIM filter evaluation and patch application
//!
//! Every failure the engine can produce is a value of [`ScimError`]. None of
//! these are retryable by the engine itself; each client-error variant maps to
//! one RFC 7644 `scimType` keyword via [`ScimError::scim_type`] so the
//! transport layer can build a protocol-compliant error body.

use thiserror::Error;

use crate::parser::ParseError;

/// Result type alias for SCIM engine operations
pub type Result<T> = std::result::Result<T, ScimError>;

/// Error type covering filter evaluation and patch application
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScimError {
    /// Malformed filter or path text
    #[error(transparent)]
    FilterParse(#[from] ParseError),

    /// A patch path that does not resolve to a schema attribute
    #[error("invalid path '{path}'")]
    InvalidPath {
        /// Textual form of the offending path
        path: String,
    },

    /// A patch value that is not acceptable for the targeted attribute
    #[error("invalid value: {message}")]
    InvalidValue {
        /// Human-readable description of the problem
        message: String,
    },

    /// A remove operation without a path
    #[error("remove operation requires a path")]
    NoPath,

    /// A filtered patch path that matched no element
    #[error("no target matched path '{path}'")]
    NoTarget {
        /// Textual form of the path whose filter matched nothing
        path: String,
    },

    /// A patch path that resolved to more than one target where a single
    /// target is required
    #[error("path '{path}' matches more than one target")]
    TooMany {
        /// Textual form of the ambiguous path
        path: String,
    },

    /// More than one element of a multi-valued attribute marked primary
    #[error("attribute '{attribute}' has more than one primary value")]
    Uniqueness {
        /// Name of the multi-valued attribute
        attribute: String,
    },

    /// Write to a readOnly or immutable attribute
    #[error("attribute '{attribute}' is not modifiable ({mutability})")]
    Mutability {
        /// Name of the attribute
        attribute: String,
        /// The mutability that forbids the write
        mutability: String,
    },

    /// An ordering operator applied to a type without a total order
    #[error("operator '{op}' is not supported for {value_type} values")]
    UnsupportedFilterOperator {
        /// The filter operator
        op: String,
        /// The attribute value type it was applied to
        value_type: String,
    },

    /// A patch verb the engine does not implement
    #[error("unsupported operation: {message}")]
    UnsupportedOperation {
        /// Human-readable description
        message: String,
    },

    /// Misuse of the filter builder DSL
    #[error("filter builder error: {message}")]
    FilterBuilder {
        /// Human-readable description
        message: String,
    },
}

impl ScimError {
    /// Create an [`ScimError::InvalidValue`] from a message
    pub fn invalid_value(message: impl Into<String>) -> Self {
        ScimError::InvalidValue {
            message: message.into(),
        }
    }

    /// Create an [`ScimError::InvalidPath`] from a path's textual form
    pub fn invalid_path(path: impl Into<String>) -> Self {
        ScimError::InvalidPath { path: path.into() }
    }

    /// Create an [`ScimError::UnsupportedOperation`] from a message
    pub fn unsupported(message: impl Into<String>) -> Self {
        ScimError::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// The RFC 7644 `scimType` keyword for this error
    ///
    /// The transport layer puts this verbatim into the error response body.
    /// All of these map to 400-class responses.
    pub fn scim_type(&self) -> &'static str {
        match self {
            ScimError::FilterParse(_) => "invalidFilter",
            ScimError::InvalidPath { .. } => "invalidPath",
            ScimError::InvalidValue { .. } => "invalidValue",
            ScimError::NoPath => "noTarget",
            ScimError::NoTarget { .. } => "noTarget",
            ScimError::TooMany { .. } => "tooMany",
            ScimError::Uniqueness { .. } => "uniqueness",
            ScimError::Mutability { .. } => "mutability",
            ScimError::UnsupportedFilterOperator { .. } => "invalidFilter",
            ScimError::UnsupportedOperation { .. } => "invalidValue",
            ScimError::FilterBuilder { .. } => "invalidFilter",
        }
    }
}
