//! Notifier port

use async_trait::async_trait;
use tokenrelay_domain::Notice;

/// Port for blocking user-visible notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows `notice`; returns once the user has been told (and, for
    /// blocking implementations, has acknowledged it).
    async fn notify(&self, notice: Notice);
}
