//! SCIM filter and path parser
//!
//! Hand-written tokenizer plus a recursive-descent parser, converting filter
//! text into [`crate::ast::FilterExpression`] trees and patch-path text into
//! [`crate::path::PatchPath`] values.

mod error;
mod parser;
mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use parser::{parse_filter, parse_path};
pub use tokenizer::{Token, tokenize};
