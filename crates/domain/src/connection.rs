//! Connection type tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Type name that identifies a managed connection object in the host session.
///
/// Must be a Python identifier or a dotted path of identifiers, because the
/// kernel registry splices it into an `isinstance` check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectionTag(String);

/// Default tag used by the notebook client library.
pub const DEFAULT_CONNECTION_TAG: &str = "ConqueryConnection";

impl ConnectionTag {
    /// Validates and wraps a tag.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidConnectionTag`] when any dotted segment is
    /// not an identifier.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.is_empty() || !value.split('.').all(is_identifier) {
            return Err(DomainError::InvalidConnectionTag(value));
        }
        Ok(Self(value))
    }

    /// The tag as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl Default for ConnectionTag {
    fn default() -> Self {
        Self(DEFAULT_CONNECTION_TAG.to_string())
    }
}

impl fmt::Display for ConnectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ConnectionTag {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConnectionTag> for String {
    fn from(tag: ConnectionTag) -> Self {
        tag.0
    }
}
