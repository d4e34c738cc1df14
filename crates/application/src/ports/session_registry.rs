//! Session registry port
//!
//! The host session's set of live connection objects, seen from the relay.
//! The relay only overwrites their token; it never creates or destroys them.

use async_trait::async_trait;
use tokenrelay_domain::{ConnectionTag, Token};

/// Errors that can occur while writing a token into the host session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The host session could not be reached.
    #[error("host session unreachable: {0}")]
    Unreachable(String),

    /// The host session received the write but refused or failed it.
    #[error("host session rejected the update: {0}")]
    Rejected(String),
}

/// Outcome of one publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Objects carrying the recognized connection tag.
    pub matched: usize,
    /// Objects whose token actually changed.
    pub updated: usize,
}

/// Capability of an object that can hold the relay's token.
///
/// Holders are resolved at registration time, so publishing never has to
/// scan for types.
pub trait TokenHolder: Send + Sync {
    /// Type tag of this connection object.
    fn connection_tag(&self) -> &ConnectionTag;

    /// The token currently held.
    fn token(&self) -> Option<Token>;

    /// Overwrites the held token.
    fn set_token(&self, token: &Token);
}

/// Port for writing the current token into the host session.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Writes `token` into every managed connection object.
    ///
    /// Must be idempotent and must succeed on an empty session.
    ///
    /// # Errors
    /// Returns an error when the host session cannot be updated.
    async fn publish(&self, token: &Token) -> Result<PublishReport, PublishError>;
}
