//! Observable status of a refresh run.

use chrono::{DateTime, Utc};
use tokenrelay_domain::RefreshState;

/// Snapshot of a refresh run, broadcast after every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshStatus {
    /// Current refresh cycle state.
    pub state: RefreshState,
    /// Successful publish calls (initial one included).
    pub publishes: u64,
    /// Publish calls the host session refused or never received.
    pub publish_failures: u64,
    /// Successful renewals.
    pub renewals: u64,
    /// When the token was last written to the session.
    pub last_published_at: Option<DateTime<Utc>>,
}

impl RefreshStatus {
    /// Status of a run that has just entered `Active`.
    #[must_use]
    pub fn active() -> Self {
        Self {
            state: RefreshState::Active,
            ..Self::default()
        }
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self.state {
            RefreshState::Authenticating => "Waiting for login".to_string(),
            RefreshState::Active => format!(
                "Active: {} renewals, {} publishes",
                self.renewals, self.publishes
            ),
            RefreshState::Failed => format!("Failed after {} renewals", self.renewals),
        }
    }
}
