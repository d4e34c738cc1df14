//! The fixed set of user-visible notices.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A blocking notice shown to the user. No other states are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// Interactive login completed.
    LoginSucceeded,
    /// The identity provider reported the user as not authenticated.
    LoginFailed,
    /// The identity-provider client could not be set up.
    InitializationFailed,
    /// Silent renewal was rejected; a fresh login is required.
    RenewalFailed,
}

impl Notice {
    /// Text shown to the user.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::LoginSucceeded => "Authentication succeeded.",
            Self::LoginFailed => {
                "Authentication was not successful. Please contact your administrator."
            }
            Self::InitializationFailed => {
                "Initializing the authentication failed. Please contact your administrator."
            }
            Self::RenewalFailed => {
                "The connection to the identity provider was lost. A new login is required."
            }
        }
    }

    /// Returns true for every notice except [`Notice::LoginSucceeded`].
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::LoginSucceeded)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_login_success_is_not_a_failure() {
        assert!(!Notice::LoginSucceeded.is_failure());
        assert!(Notice::LoginFailed.is_failure());
        assert!(Notice::InitializationFailed.is_failure());
        assert!(Notice::RenewalFailed.is_failure());
    }

    #[test]
    fn test_renewal_failure_asks_for_new_login() {
        assert!(Notice::RenewalFailed.to_string().contains("new login"));
    }
}
