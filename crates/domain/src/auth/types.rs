//! Bearer token types

use std::fmt;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Opaque bearer credential issued by the identity provider.
///
/// The value is never interpreted by the relay except for the optional
/// `exp` claim lookup in [`Token::jwt_expiry`]. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Wraps a raw token value. Empty or whitespace-only values are rejected.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidToken`] for blank input.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidToken("token is empty".to_string()));
        }
        Ok(Self(value))
    }

    /// The raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short preview for logs (first 8 chars + ...).
    #[must_use]
    pub fn preview(&self) -> String {
        if self.0.chars().count() > 12 {
            let head: String = self.0.chars().take(8).collect();
            format!("{head}...")
        } else {
            "***".to_string()
        }
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Reads the `exp` claim when the token is a JWT.
    ///
    /// Returns `None` for anything that does not decode as a JWT payload
    /// carrying a numeric `exp`.
    #[must_use]
    pub fn jwt_expiry(&self) -> Option<DateTime<Utc>> {
        let mut parts = self.0.split('.');
        let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = claims.get("exp")?.as_i64()?;
        DateTime::from_timestamp(exp, 0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.preview()).finish()
    }
}

impl TryFrom<String> for Token {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// How much remaining lifetime a token must have before renewal is skipped.
///
/// `Force` is the "renew even if not yet near expiry" sentinel used by the
/// refresh scheduler: its fixed interval, not the token's lifetime, decides
/// when to renew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinValidity {
    /// Always renew.
    #[default]
    Force,
    /// Renew only when the token expires within this many seconds.
    Seconds(u32),
}

impl MinValidity {
    /// Maps the Keycloak adapter convention, where any negative value forces renewal.
    #[must_use]
    pub fn from_keycloak(value: i64) -> Self {
        u32::try_from(value).map_or(Self::Force, Self::Seconds)
    }

    /// Inverse of [`MinValidity::from_keycloak`].
    #[must_use]
    pub fn as_keycloak(self) -> i64 {
        match self {
            Self::Force => -1,
            Self::Seconds(secs) => i64::from(secs),
        }
    }
}

/// Token bundle held by a credential provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// The bearer token handed to session objects.
    pub access_token: Token,
    /// Refresh token for silent renewal.
    pub refresh_token: Option<String>,
    /// When the access token expires (if known).
    pub expires_at: Option<DateTime<Utc>>,
    /// When this bundle was obtained.
    pub obtained_at: DateTime<Utc>,
}

impl TokenSet {
    /// Builds a token set from a token endpoint response.
    ///
    /// Falls back to the JWT `exp` claim when `expires_in` is absent.
    #[must_use]
    pub fn new(
        access_token: Token,
        refresh_token: Option<String>,
        expires_in_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = expires_in_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + chrono::Duration::seconds(secs))
            .or_else(|| access_token.jwt_expiry());

        Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            obtained_at: now,
        }
    }

    /// Check if the token is expired or will expire within the given buffer.
    #[must_use]
    pub fn is_expired_or_expiring(&self, buffer_seconds: i64, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            let buffer = chrono::Duration::seconds(buffer_seconds);
            now + buffer >= expires_at
        })
    }

    /// Whether a renewal request with `min_validity` should hit the provider.
    ///
    /// Unknown expiry counts as expiring.
    #[must_use]
    pub fn needs_renewal(&self, min_validity: MinValidity, now: DateTime<Utc>) -> bool {
        match min_validity {
            MinValidity::Force => true,
            MinValidity::Seconds(_) if self.expires_at.is_none() => true,
            MinValidity::Seconds(secs) => self.is_expired_or_expiring(i64::from(secs), now),
        }
    }

    /// Check if the token can be refreshed.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Time until expiry in seconds, or None if no expiry.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|exp| (exp - now).num_seconds())
    }
}
