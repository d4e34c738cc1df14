//! Refresh cycle state machine.
//!
//! The cycle has three states and exactly these edges:
//! - `Authenticating -> Active`: first successful login
//! - `Authenticating -> Failed`: login or initialization failed
//! - `Active -> Active`: successful renewal (publishes the new token)
//! - `Active -> Failed`: first renewal failure
//!
//! `Failed` is terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Lifecycle of one relay run. Lives in memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    /// Waiting for the interactive login to finish.
    #[default]
    Authenticating,
    /// Token is being published and renewed on a fixed interval.
    Active,
    /// Renewal (or login) failed; nothing is written anymore.
    Failed,
}

impl RefreshState {
    /// Returns true if no transition leaves this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true while tokens are being published.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether `self -> next` is an edge of the state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Authenticating, Self::Active | Self::Failed)
                | (Self::Active, Self::Active | Self::Failed)
        )
    }

    /// Moves to `next`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] for edges the machine lacks,
    /// which includes every transition out of `Failed`.
    pub fn transition(self, next: Self) -> DomainResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authenticating => "authenticating",
            Self::Active => "active",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_state_transitions() {
        let state = RefreshState::default();
        assert_eq!(state, RefreshState::Authenticating);

        let state = state.transition(RefreshState::Active);
        assert_eq!(state, Ok(RefreshState::Active));

        let state = RefreshState::Active.transition(RefreshState::Active);
        assert_eq!(state, Ok(RefreshState::Active));

        let state = RefreshState::Active.transition(RefreshState::Failed);
        assert_eq!(state, Ok(RefreshState::Failed));
    }

    #[test]
    fn test_failed_is_terminal() {
        assert!(RefreshState::Failed.is_terminal());
        for next in [
            RefreshState::Authenticating,
            RefreshState::Active,
            RefreshState::Failed,
        ] {
            assert!(!RefreshState::Failed.can_transition_to(next));
        }
        assert_eq!(
            RefreshState::Failed.transition(RefreshState::Active),
            Err(DomainError::InvalidTransition {
                from: RefreshState::Failed,
                to: RefreshState::Active,
            })
        );
    }

    #[test]
    fn test_active_cannot_go_back_to_authenticating() {
        assert!(!RefreshState::Active.can_transition_to(RefreshState::Authenticating));
    }

    #[test]
    fn test_display() {
        assert_eq!(RefreshState::Active.to_string(), "active");
    }
}
