//! Credential provider port.
//!
//! This module defines the interface to the identity-provider client
//! that performs the interactive login and the silent renewals.

use async_trait::async_trait;
use tokenrelay_domain::{MinValidity, Token};

/// Errors reported by a credential provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The provider client could not be set up.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// The identity provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The identity provider refused the request (e.g. session expired).
    #[error("rejected by identity provider: {0}")]
    Rejected(String),

    /// The identity provider answered with something unexpected.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No token is held, so there is nothing to renew or publish.
    #[error("no token available")]
    NoToken,

    /// The provider cannot renew tokens at all.
    #[error("token renewal is not supported by this provider")]
    RenewalUnsupported,
}

/// Result of the interactive login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The user is authenticated and a token is available.
    Authenticated,
    /// The identity provider reported the user as not authenticated.
    NotAuthenticated,
}

impl LoginOutcome {
    /// Returns true for [`LoginOutcome::Authenticated`].
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Result of a successful renewal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// A new token was obtained.
    Refreshed,
    /// The held token satisfied the requested minimum validity.
    StillValid,
}

/// Trait for identity-provider clients.
///
/// Implementations own the token; callers only read it through
/// [`CredentialProvider::current_token`].
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Sets up the client (endpoint discovery, configuration checks).
    ///
    /// # Errors
    /// Returns [`CredentialError::Initialization`] (or a network error) when
    /// the client cannot be used at all.
    async fn initialize(&self) -> Result<(), CredentialError>;

    /// Runs the one-time interactive login.
    ///
    /// # Errors
    /// Returns an error when the login could not be carried out. A completed
    /// login that the provider declined is `Ok(LoginOutcome::NotAuthenticated)`.
    async fn login(&self) -> Result<LoginOutcome, CredentialError>;

    /// The current bearer token, if any.
    async fn current_token(&self) -> Option<Token>;

    /// Silently renews the token.
    ///
    /// `MinValidity::Force` renews regardless of the remaining lifetime.
    ///
    /// # Errors
    /// Returns an error when the renewal was rejected or could not be sent.
    async fn renew(&self, min_validity: MinValidity) -> Result<RenewOutcome, CredentialError>;

    /// Whether [`CredentialProvider::renew`] can ever produce a new token.
    fn supports_renewal(&self) -> bool {
        true
    }
}
