//! Attribute schema model
//!
//! Static, per-resource-type metadata describing every attribute a resource
//! can carry. Loaded once at startup and treated as immutable afterwards; the
//! filter and patch engines only ever read it, so a loaded [`Schema`] is safe
//! to share across threads without synchronization.

mod core;
mod registry;

pub use self::core::{
    ENTERPRISE_USER_URN, GROUP_URN, USER_URN, core_group_schema, core_user_schema,
    enterprise_user_schema,
};
pub use registry::SchemaRegistry;

use indexmap::IndexMap;

/// Value type of a schema attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Textual value
    String,
    /// Boolean value
    Boolean,
    /// Numeric value (integer or decimal)
    Number,
    /// Timestamp value, RFC 3339 text on the wire
    Date,
    /// Structured value with sub-attributes
    Complex,
    /// Reference to another resource
    Reference,
}

impl AttributeType {
    /// Lowercase name as used in schema documents
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Number => "number",
            AttributeType::Date => "dateTime",
            AttributeType::Complex => "complex",
            AttributeType::Reference => "reference",
        }
    }
}

/// Mutability of a schema attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mutability {
    /// Never writable by clients
    ReadOnly,
    /// Readable and writable
    #[default]
    ReadWrite,
    /// Writable but never returned
    WriteOnly,
    /// Writable at creation, fixed afterwards
    Immutable,
}

impl Mutability {
    /// Lowercase camelCase name as used in schema documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutability::ReadOnly => "readOnly",
            Mutability::ReadWrite => "readWrite",
            Mutability::WriteOnly => "writeOnly",
            Mutability::Immutable => "immutable",
        }
    }
}

/// Return policy of a schema attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Returned {
    /// Always returned
    Always,
    /// Returned unless excluded by the request
    #[default]
    Default,
    /// Returned only when requested
    Request,
    /// Never returned; also invisible to filters
    Never,
}

/// Schema metadata for one attribute
///
/// Immutable once constructed. Complex attributes carry an ordered table of
/// sub-attributes; every other type has none.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    urn: String,
    value_type: AttributeType,
    multi_valued: bool,
    case_exact: bool,
    mutability: Mutability,
    returned: Returned,
    identifier_reference: bool,
    canonical_values: Vec<String>,
    sub_attributes: IndexMap<String, Attribute>,
}

impl Attribute {
    /// Create a string attribute
    pub fn string(name: impl Into<String>) -> Self {
        Self::simple(name, AttributeType::String)
    }

    /// Create a boolean attribute
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::simple(name, AttributeType::Boolean)
    }

    /// Create a number attribute
    pub fn number(name: impl Into<String>) -> Self {
        Self::simple(name, AttributeType::Number)
    }

    /// Create a dateTime attribute
    pub fn date(name: impl Into<String>) -> Self {
        Self::simple(name, AttributeType::Date)
    }

    /// Create a reference attribute
    pub fn reference(name: impl Into<String>) -> Self {
        let mut attr = Self::simple(name, AttributeType::Reference);
        attr.identifier_reference = true;
        attr
    }

    /// Create a complex attribute from its sub-attributes
    ///
    /// Panics if `children` is empty: a complex attribute always has at least
    /// one sub-attribute. Schemas are built by static constructors at load
    /// time, so this is a programming error, not a runtime condition.
    pub fn complex(name: impl Into<String>, children: Vec<Attribute>) -> Self {
        assert!(
            !children.is_empty(),
            "complex attribute must have at least one sub-attribute"
        );
        let mut attr = Self::simple(name, AttributeType::Complex);
        attr.sub_attributes = children
            .into_iter()
            .map(|c| (c.name.to_ascii_lowercase(), c))
            .collect();
        attr
    }

    fn simple(name: impl Into<String>, value_type: AttributeType) -> Self {
        Attribute {
            name: name.into(),
            urn: String::new(),
            value_type,
            multi_valued: false,
            case_exact: false,
            mutability: Mutability::default(),
            returned: Returned::default(),
            identifier_reference: false,
            canonical_values: Vec::new(),
            sub_attributes: IndexMap::new(),
        }
    }

    /// Mark the attribute multi-valued
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Mark string comparisons on this attribute case-sensitive
    pub fn case_exact(mut self) -> Self {
        self.case_exact = true;
        self
    }

    /// Set the mutability
    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    /// Set the return policy
    pub fn with_returned(mut self, returned: Returned) -> Self {
        self.returned = returned;
        self
    }

    /// Set the canonical value set
    pub fn canonical_values(mut self, values: &[&str]) -> Self {
        self.canonical_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Attribute name as declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URN of the owning schema
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Value type
    pub fn value_type(&self) -> AttributeType {
        self.value_type
    }

    /// Whether the attribute holds a collection of values
    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    /// Whether string comparisons are case-sensitive
    pub fn is_case_exact(&self) -> bool {
        self.case_exact
    }

    /// Mutability of the attribute
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Return policy of the attribute
    pub fn returned(&self) -> Returned {
        self.returned
    }

    /// Whether this attribute is a cross-resource identifier reference
    pub fn is_identifier_reference(&self) -> bool {
        self.identifier_reference
    }

    /// Canonical value set, empty when unconstrained
    pub fn canonical_value_set(&self) -> &[String] {
        &self.canonical_values
    }

    /// Whether the attribute is complex
    pub fn is_complex(&self) -> bool {
        self.value_type == AttributeType::Complex
    }

    /// Case-insensitive sub-attribute lookup
    pub fn sub_attribute(&self, name: &str) -> Option<&Attribute> {
        self.sub_attributes.get(&name.to_ascii_lowercase())
    }

    /// Sub-attributes in declaration order (empty unless complex)
    pub fn sub_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.sub_attributes.values()
    }

    fn attach_urn(&mut self, urn: &str) {
        self.urn = urn.to_string();
        for sub in self.sub_attributes.values_mut() {
            sub.attach_urn(urn);
        }
    }
}

/// One schema: a URN-identified, ordered set of attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    urn: String,
    name: String,
    attributes: IndexMap<String, Attribute>,
}

impl Schema {
    /// Build a schema from its URN, display name and attributes
    pub fn new(urn: impl Into<String>, name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        let urn = urn.into();
        let attributes = attributes
            .into_iter()
            .map(|mut a| {
                a.attach_urn(&urn);
                (a.name.to_ascii_lowercase(), a)
            })
            .collect();
        Schema {
            urn,
            name: name.into(),
            attributes,
        }
    }

    /// Schema URN
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive attribute lookup
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }
}

/// A resource type: one base schema plus its extension schemas
///
/// Extension attributes live under the extension's URN key inside the
/// resource document; the base schema's attributes live at the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceType {
    name: String,
    base: Schema,
    extensions: Vec<Schema>,
}

impl ResourceType {
    /// Build a resource type from a base schema and its extensions
    pub fn new(name: impl Into<String>, base: Schema, extensions: Vec<Schema>) -> Self {
        ResourceType {
            name: name.into(),
            base,
            extensions,
        }
    }

    /// The standard User resource type (core schema + enterprise extension)
    pub fn user() -> Self {
        ResourceType::new(
            "User",
            core_user_schema(),
            vec![enterprise_user_schema()],
        )
    }

    /// The standard Group resource type
    pub fn group() -> Self {
        ResourceType::new("Group", core_group_schema(), Vec::new())
    }

    /// Resource type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base schema
    pub fn base(&self) -> &Schema {
        &self.base
    }

    /// Extension schemas in registration order
    pub fn extensions(&self) -> &[Schema] {
        &self.extensions
    }

    /// Resolve an optional URN to the owning schema
    ///
    /// `None` and the base URN both resolve to the base schema; any other
    /// URN is matched case-insensitively against the extensions.
    pub fn schema_for(&self, urn: Option<&str>) -> Option<&Schema> {
        match urn {
            None => Some(&self.base),
            Some(urn) if urn.eq_ignore_ascii_case(&self.base.urn) => Some(&self.base),
            Some(urn) => self
                .extensions
                .iter()
                .find(|ext| ext.urn.eq_ignore_ascii_case(urn)),
        }
    }

    /// Resolve an attribute name against the base schema
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.base.attribute(name)
    }
}
