//! Built-in RFC 7643 core schemas
//!
//! The core User and Group schemas plus the enterprise User extension,
//! constructed once and cloned out on demand. Deployments with custom
//! resource types register their own [`Schema`]s instead.

use once_cell::sync::Lazy;

use super::{Attribute, Mutability, Returned, Schema};

/// URN of the core User schema
pub const USER_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
/// URN of the core Group schema
pub const GROUP_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
/// URN of the enterprise User extension schema
pub const ENTERPRISE_USER_URN: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

fn typed_multi_valued(name: &str, canonical: &[&str]) -> Attribute {
    Attribute::complex(
        name,
        vec![
            Attribute::string("value"),
            Attribute::string("display"),
            Attribute::string("type").canonical_values(canonical),
            Attribute::boolean("primary"),
        ],
    )
    .multi_valued()
}

static USER: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        USER_URN,
        "User",
        vec![
            Attribute::string("schemas")
                .multi_valued()
                .case_exact()
                .with_returned(Returned::Always),
            Attribute::string("id")
                .with_mutability(Mutability::ReadOnly)
                .with_returned(Returned::Always)
                .case_exact(),
            Attribute::string("externalId").case_exact(),
            Attribute::string("userName").with_returned(Returned::Always),
            Attribute::complex(
                "name",
                vec![
                    Attribute::string("formatted"),
                    Attribute::string("familyName"),
                    Attribute::string("givenName"),
                    Attribute::string("middleName"),
                    Attribute::string("honorificPrefix"),
                    Attribute::string("honorificSuffix"),
                ],
            ),
            Attribute::string("displayName"),
            Attribute::string("nickName"),
            Attribute::reference("profileUrl"),
            Attribute::string("title"),
            Attribute::string("userType"),
            Attribute::string("preferredLanguage"),
            Attribute::string("locale"),
            Attribute::string("timezone"),
            Attribute::boolean("active"),
            Attribute::string("password")
                .with_mutability(Mutability::WriteOnly)
                .with_returned(Returned::Never),
            typed_multi_valued("emails", &["work", "home", "other"]),
            typed_multi_valued("phoneNumbers", &["work", "home", "mobile", "fax", "pager", "other"]),
            typed_multi_valued("ims", &["aim", "gtalk", "icq", "xmpp", "msn", "skype", "qq", "yahoo"]),
            typed_multi_valued("photos", &["photo", "thumbnail"]),
            Attribute::complex(
                "addresses",
                vec![
                    Attribute::string("formatted"),
                    Attribute::string("streetAddress"),
                    Attribute::string("locality"),
                    Attribute::string("region"),
                    Attribute::string("postalCode"),
                    Attribute::string("country"),
                    Attribute::string("type").canonical_values(&["work", "home", "other"]),
                    Attribute::boolean("primary"),
                ],
            )
            .multi_valued(),
            Attribute::complex(
                "groups",
                vec![
                    Attribute::string("value").with_mutability(Mutability::ReadOnly),
                    Attribute::reference("$ref").with_mutability(Mutability::ReadOnly),
                    Attribute::string("display").with_mutability(Mutability::ReadOnly),
                    Attribute::string("type")
                        .canonical_values(&["direct", "indirect"])
                        .with_mutability(Mutability::ReadOnly),
                ],
            )
            .multi_valued()
            .with_mutability(Mutability::ReadOnly),
            typed_multi_valued("entitlements", &[]),
            typed_multi_valued("roles", &[]),
            typed_multi_valued("x509Certificates", &[]),
            Attribute::complex(
                "meta",
                vec![
                    Attribute::string("resourceType"),
                    Attribute::date("created"),
                    Attribute::date("lastModified"),
                    Attribute::reference("location"),
                    Attribute::string("version").case_exact(),
                ],
            )
            .with_mutability(Mutability::ReadOnly),
        ],
    )
});

static GROUP: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        GROUP_URN,
        "Group",
        vec![
            Attribute::string("schemas")
                .multi_valued()
                .case_exact()
                .with_returned(Returned::Always),
            Attribute::string("id")
                .with_mutability(Mutability::ReadOnly)
                .with_returned(Returned::Always)
                .case_exact(),
            Attribute::string("externalId").case_exact(),
            Attribute::string("displayName").with_returned(Returned::Always),
            Attribute::complex(
                "members",
                vec![
                    Attribute::string("value").with_mutability(Mutability::Immutable),
                    Attribute::reference("$ref").with_mutability(Mutability::Immutable),
                    Attribute::string("display").with_mutability(Mutability::Immutable),
                    Attribute::string("type")
                        .canonical_values(&["User", "Group"])
                        .with_mutability(Mutability::Immutable),
                ],
            )
            .multi_valued(),
        ],
    )
});

static ENTERPRISE_USER: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        ENTERPRISE_USER_URN,
        "EnterpriseUser",
        vec![
            Attribute::string("employeeNumber"),
            Attribute::string("costCenter"),
            Attribute::string("organization"),
            Attribute::string("division"),
            Attribute::string("department"),
            Attribute::complex(
                "manager",
                vec![
                    Attribute::string("value"),
                    Attribute::reference("$ref"),
                    Attribute::string("displayName").with_mutability(Mutability::ReadOnly),
                ],
            ),
        ],
    )
});

/// The RFC 7643 core User schema
pub fn core_user_schema() -> Schema {
    USER.clone()
}

/// The RFC 7643 core Group schema
pub fn core_group_schema() -> Schema {
    GROUP.clone()
}

/// The RFC 7643 enterprise User extension schema
pub fn enterprise_user_schema() -> Schema {
    ENTERPRISE_USER.clone()
}
