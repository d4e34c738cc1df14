//! Application error types

use thiserror::Error;
use tokenrelay_domain::DomainError;

use crate::ports::{CredentialError, PublishError};

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The credential provider failed.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Writing the token to the host session failed.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
