//! Domain error types

use thiserror::Error;

use crate::state::RefreshState;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A token value is empty or otherwise unusable.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A connection type tag is not a valid (dotted) identifier.
    #[error("invalid connection tag: {0}")]
    InvalidConnectionTag(String),

    /// A settings value failed validation.
    #[error("invalid setting `{field}`: {message}")]
    InvalidSetting {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The refresh cycle was asked to move along an edge it does not have.
    #[error("invalid refresh state transition: {from} -> {to}")]
    InvalidTransition {
        /// State before the attempted transition.
        from: RefreshState,
        /// Requested target state.
        to: RefreshState,
    },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidSetting`].
    pub fn setting(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
