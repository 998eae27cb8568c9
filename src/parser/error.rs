//! Parse error type for filter and path text

use thiserror::Error;

/// Result type alias for parsing operations
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Lexical or syntactic error in filter or path text
///
/// Carries the byte position and the offending fragment so the transport
/// layer can point at the problem in its error body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at position {position} near '{fragment}': {message}")]
pub struct ParseError {
    /// Human-readable description of the problem
    pub message: String,
    /// The offending slice of the input
    pub fragment: String,
    /// Byte offset of the fragment in the input (0-based)
    pub position: usize,
}

impl ParseError {
    /// Create a parse error at a position
    pub fn new(message: impl Into<String>, fragment: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            fragment: fragment.into(),
            position,
        }
    }

    /// Create an error for an invalid attribute path
    pub fn invalid_path(path: &str, message: impl Into<String>) -> Self {
        ParseError::new(message, path, 0)
    }

    /// Create an error for unexpected end of input
    pub fn unexpected_end(input: &str) -> Self {
        ParseError::new("unexpected end of input", input, input.len())
    }
}
