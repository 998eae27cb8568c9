//! Attribute path addressing
//!
//! [`AttributeReference`] is the dotted, optionally URN-qualified reference
//! used inside filter expressions (`urn:...:User:name.familyName`).
//! [`PatchPath`] is the richer patch-operation path, which may additionally
//! carry a bracketed value filter and, for whole-extension operations, may be
//! a bare URN with no attribute at all.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::FilterExpression;
use crate::parser::{self, ParseError};

/// Reference to a schema attribute, optionally URN-qualified
///
/// Equality and hashing are case-insensitive over all three fields, matching
/// the protocol's treatment of attribute names and URNs.
#[derive(Debug, Clone, Eq)]
pub struct AttributeReference {
    urn: Option<String>,
    attribute: String,
    sub_attribute: Option<String>,
}

impl AttributeReference {
    /// Build a reference from its parts
    pub fn new(
        urn: Option<String>,
        attribute: impl Into<String>,
        sub_attribute: Option<String>,
    ) -> Self {
        AttributeReference {
            urn,
            attribute: attribute.into(),
            sub_attribute,
        }
    }

    /// Build an unqualified single-attribute reference
    pub fn of(attribute: impl Into<String>) -> Self {
        Self::new(None, attribute, None)
    }

    /// Parse a textual reference
    ///
    /// When the text contains `:`, everything up to the final `:` is the URN;
    /// the remainder is `attr` or `attr.subAttr`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let (urn, rest) = match text.rfind(':') {
            Some(idx) => (Some(&text[..idx]), &text[idx + 1..]),
            None => (None, text),
        };
        if urn.is_some_and(str::is_empty) {
            return Err(ParseError::invalid_path(text, "empty schema urn"));
        }

        let (attribute, sub_attribute) = match rest.split_once('.') {
            Some((attr, sub)) => (attr, Some(sub)),
            None => (rest, None),
        };
        if !is_attribute_name(attribute) {
            return Err(ParseError::invalid_path(text, "invalid attribute name"));
        }
        if let Some(sub) = sub_attribute {
            if !is_attribute_name(sub) {
                return Err(ParseError::invalid_path(text, "invalid sub-attribute name"));
            }
        }

        Ok(AttributeReference {
            urn: urn.map(str::to_string),
            attribute: attribute.to_string(),
            sub_attribute: sub_attribute.map(str::to_string),
        })
    }

    /// URN of the owning schema, when qualified
    pub fn urn(&self) -> Option<&str> {
        self.urn.as_deref()
    }

    /// Attribute name
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Sub-attribute name, when present
    pub fn sub_attribute(&self) -> Option<&str> {
        self.sub_attribute.as_deref()
    }

    /// A copy of this reference without its sub-attribute
    pub fn without_sub_attribute(&self) -> Self {
        AttributeReference {
            urn: self.urn.clone(),
            attribute: self.attribute.clone(),
            sub_attribute: None,
        }
    }
}

/// `ALPHA *(ALPHA / DIGIT / "-" / "_")`, plus the `$ref` special case
fn is_attribute_name(s: &str) -> bool {
    if s == "$ref" {
        return true;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl PartialEq for AttributeReference {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_case_opt(self.urn.as_deref(), other.urn.as_deref())
            && self.attribute.eq_ignore_ascii_case(&other.attribute)
            && eq_ignore_case_opt(self.sub_attribute.as_deref(), other.sub_attribute.as_deref())
    }
}

fn eq_ignore_case_opt(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

impl Hash for AttributeReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(urn) = &self.urn {
            urn.to_ascii_lowercase().hash(state);
        }
        self.attribute.to_ascii_lowercase().hash(state);
        if let Some(sub) = &self.sub_attribute {
            sub.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for AttributeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(urn) = &self.urn {
            write!(f, "{urn}:")?;
        }
        f.write_str(&self.attribute)?;
        if let Some(sub) = &self.sub_attribute {
            write!(f, ".{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for AttributeReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AttributeReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AttributeReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        AttributeReference::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// The path of a patch operation
///
/// `urn:attr[valueFilter].subAttr`, every part optional except that a filter
/// or sub-attribute requires an attribute, and a path with no attribute (a
/// bare URN) addresses a whole extension.
#[derive(Debug, Clone)]
pub struct PatchPath {
    urn: Option<String>,
    attribute: Option<String>,
    value_filter: Option<FilterExpression>,
    sub_attribute: Option<String>,
}

impl PatchPath {
    /// A path addressing one base-schema attribute
    pub fn attribute(name: impl Into<String>) -> Self {
        PatchPath {
            urn: None,
            attribute: Some(name.into()),
            value_filter: None,
            sub_attribute: None,
        }
    }

    /// A bare-URN path addressing a whole extension object
    pub fn extension(urn: impl Into<String>) -> Self {
        PatchPath {
            urn: Some(urn.into()),
            attribute: None,
            value_filter: None,
            sub_attribute: None,
        }
    }

    /// A path built from an attribute reference
    pub fn from_reference(reference: &AttributeReference) -> Self {
        PatchPath {
            urn: reference.urn().map(str::to_string),
            attribute: Some(reference.attribute().to_string()),
            value_filter: None,
            sub_attribute: reference.sub_attribute().map(str::to_string),
        }
    }

    /// Build a path from all four parts
    pub(crate) fn new(
        urn: Option<String>,
        attribute: Option<String>,
        value_filter: Option<FilterExpression>,
        sub_attribute: Option<String>,
    ) -> Self {
        debug_assert!(
            attribute.is_some() || (value_filter.is_none() && sub_attribute.is_none()),
            "filter or sub-attribute without an attribute"
        );
        PatchPath {
            urn,
            attribute,
            value_filter,
            sub_attribute,
        }
    }

    /// Parse a textual patch path
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse_path(text)
    }

    /// Attach a value filter to this path
    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.value_filter = Some(filter);
        self
    }

    /// Attach a sub-attribute to this path
    pub fn with_sub_attribute(mut self, sub: impl Into<String>) -> Self {
        self.sub_attribute = Some(sub.into());
        self
    }

    /// URN of the owning schema, when qualified
    pub fn urn(&self) -> Option<&str> {
        self.urn.as_deref()
    }

    /// Attribute name; `None` for a bare-URN extension path
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// The bracketed value filter, when present
    pub fn value_filter(&self) -> Option<&FilterExpression> {
        self.value_filter.as_ref()
    }

    /// Sub-attribute name, when present
    pub fn sub_attribute(&self) -> Option<&str> {
        self.sub_attribute.as_deref()
    }

    /// Whether this path is a bare URN addressing a whole extension
    pub fn is_extension_path(&self) -> bool {
        self.urn.is_some() && self.attribute.is_none()
    }
}

impl PartialEq for PatchPath {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_case_opt(self.urn.as_deref(), other.urn.as_deref())
            && eq_ignore_case_opt(self.attribute.as_deref(), other.attribute.as_deref())
            && self.value_filter == other.value_filter
            && eq_ignore_case_opt(self.sub_attribute.as_deref(), other.sub_attribute.as_deref())
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.urn, &self.attribute) {
            (Some(urn), Some(attr)) => write!(f, "{urn}:{attr}")?,
            (Some(urn), None) => return f.write_str(urn),
            (None, Some(attr)) => f.write_str(attr)?,
            (None, None) => return Ok(()),
        }
        if let Some(filter) = &self.value_filter {
            write!(f, "[{filter}]")?;
        }
        if let Some(sub) = &self.sub_attribute {
            write!(f, ".{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for PatchPath {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PatchPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PatchPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PatchPath::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_unqualified() {
        let r = AttributeReference::parse("userName").unwrap();
        assert_eq!(r.urn(), None);
        assert_eq!(r.attribute(), "userName");
        assert_eq!(r.sub_attribute(), None);
    }

    #[test]
    fn parse_with_sub_attribute() {
        let r = AttributeReference::parse("name.familyName").unwrap();
        assert_eq!(r.attribute(), "name");
        assert_eq!(r.sub_attribute(), Some("familyName"));
    }

    #[test]
    fn parse_urn_qualified() {
        let r = AttributeReference::parse(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
        )
        .unwrap();
        assert_eq!(
            r.urn(),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
        assert_eq!(r.attribute(), "employeeNumber");
    }

    #[test]
    fn parse_urn_qualified_with_sub_attribute() {
        let r = AttributeReference::parse(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.displayName",
        )
        .unwrap();
        assert_eq!(r.attribute(), "manager");
        assert_eq!(r.sub_attribute(), Some("displayName"));
    }

    #[test]
    fn equality_is_case_insensitive() {
        let a = AttributeReference::parse("name.familyName").unwrap();
        let b = AttributeReference::parse("NAME.FAMILYNAME").unwrap();
        assert_eq!(a, b);

        let c = AttributeReference::parse("name.givenName").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_bad_names() {
        assert!(AttributeReference::parse("1name").is_err());
        assert!(AttributeReference::parse("na me").is_err());
        assert!(AttributeReference::parse("").is_err());
        assert!(AttributeReference::parse("$ref").is_ok());
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "userName",
            "name.familyName",
            "urn:ietf:params:scim:schemas:core:2.0:User:userName",
        ] {
            let r = AttributeReference::parse(text).unwrap();
            assert_eq!(r.to_string(), text);
        }
    }

    #[test]
    fn extension_patch_path_is_bare_urn() {
        let p = PatchPath::extension("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User");
        assert!(p.is_extension_path());
        assert_eq!(
            p.to_string(),
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"
        );
    }
}
