use crate::error::{Error, Result};
use std::borrow::Borrow;
use std::fmt;

const MAX_NAME_LEN: usize = 128;

fn validate_simple_name(value: &str, kind: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidId(format!("{kind} must not be empty")));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::InvalidId(format!(
            "{kind} length must be <= {MAX_NAME_LEN}"
        )));
    }
    if !trimmed.chars().all(is_allowed_name_char) {
        return Err(Error::InvalidId(format!(
            "{kind} contains invalid characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn is_allowed_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ':' | '_' | '-')
}

macro_rules! define_id_type {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier.
            pub fn new(value: impl AsRef<str>) -> Result<Self> {
                validate_simple_name(value.as_ref(), $kind).map(Self)
            }

            /// Creates an identifier from a trusted string without validation.
            pub fn from_string(value: String) -> Self {
                Self(value)
            }

            /// Returns the underlying string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from_string(value)
            }
        }
    };
}

define_id_type!(
    /// Tenant scope identifier. All lookups are partitioned by this.
    TenantScope,
    "tenant scope"
);
define_id_type!(
    /// Identity identifier.
    IdentityId,
    "identity id"
);
define_id_type!(
    /// Group identifier.
    GroupId,
    "group id"
);
define_id_type!(
    /// Grant identifier.
    GrantId,
    "grant id"
);

/// Authenticated identity for one request.
///
/// Produced by an external authentication step (for example the JWT layer
/// behind the `axum-jwt` feature) and immutable for the request's lifetime.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    /// Identity identifier.
    pub id: IdentityId,
    /// Optional email address carried along from authentication.
    pub email: Option<String>,
    /// Tenant scope this identity is acting within.
    pub tenant_scope: TenantScope,
}

impl Identity {
    /// Creates an identity without an email.
    pub fn new(id: IdentityId, tenant_scope: TenantScope) -> Self {
        Self {
            id,
            email: None,
            tenant_scope,
        }
    }

    /// Attaches an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Dot-segmented resource string (`"user"`, `"payroll.salary"`, `"user.*"`,
/// `"*.*"`).
///
/// Construction trims whitespace and normalizes to ASCII lowercase. Every
/// dot-segment must be non-empty and consist of `[a-z0-9_-]` or be the
/// literal `*`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Resource(String);

impl Resource {
    /// Parses and validates a resource string.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidResource(
                "resource must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(Error::InvalidResource(format!(
                "resource length must be <= {MAX_NAME_LEN}"
            )));
        }
        let normalized = trimmed.to_ascii_lowercase();
        for segment in normalized.split('.') {
            if !is_valid_resource_segment(segment) {
                return Err(Error::InvalidResource(format!(
                    "resource segment {segment:?} is invalid"
                )));
            }
        }
        Ok(Self(normalized))
    }

    /// Creates a resource from a trusted string without validation.
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the segment before the first `.`, or the whole string when
    /// there is none.
    pub fn first_segment(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

fn is_valid_resource_segment(segment: &str) -> bool {
    if segment == "*" {
        return true;
    }
    if segment.is_empty() {
        return false;
    }
    segment
        .chars()
        .all(|ch| matches!(ch, 'a'..='z' | '0'..='9' | '_' | '-'))
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Resource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Resource {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Resource {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<String> for Resource {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}
