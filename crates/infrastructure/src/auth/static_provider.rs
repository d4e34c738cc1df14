//! Fixed-token credential provider.

use async_trait::async_trait;
use tokenrelay_application::ports::{
    CredentialError, CredentialProvider, LoginOutcome, RenewOutcome,
};
use tokenrelay_domain::{MinValidity, Token};
use tracing::debug;

/// Hands out a token supplied by configuration.
///
/// Login always succeeds and the token never changes, so the bridge
/// publishes it once and does not schedule renewals.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Token,
}

impl StaticTokenProvider {
    /// Creates a provider for `token`.
    #[must_use]
    pub const fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn initialize(&self) -> Result<(), CredentialError> {
        Ok(())
    }

    async fn login(&self) -> Result<LoginOutcome, CredentialError> {
        debug!(token = %self.token.preview(), "using configured token");
        Ok(LoginOutcome::Authenticated)
    }

    async fn current_token(&self) -> Option<Token> {
        Some(self.token.clone())
    }

    async fn renew(&self, _min_validity: MinValidity) -> Result<RenewOutcome, CredentialError> {
        Err(CredentialError::RenewalUnsupported)
    }

    fn supports_renewal(&self) -> bool {
        false
    }
}
