//! Registry of token holders keyed by binding name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokenrelay_domain::{ConnectionTag, Token};
use tokio::sync::RwLock;

use crate::ports::{PublishError, PublishReport, SessionRegistry, TokenHolder};

/// Errors raised when registering a holder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The holder's tag is not the one this registry manages.
    #[error("`{name}` is a {actual}, expected a {expected}")]
    TagMismatch {
        /// Binding name the holder was registered under.
        name: String,
        /// Tag managed by the registry.
        expected: ConnectionTag,
        /// Tag reported by the holder.
        actual: ConnectionTag,
    },
}

/// Thread-safe registry of connection objects that receive the token.
///
/// Registering under an existing name replaces the previous binding, the
/// same way rebinding a notebook global does.
#[derive(Clone)]
pub struct HolderRegistry {
    tag: ConnectionTag,
    holders: Arc<RwLock<BTreeMap<String, Arc<dyn TokenHolder>>>>,
}

impl HolderRegistry {
    /// Creates an empty registry managing holders tagged `tag`.
    #[must_use]
    pub fn new(tag: ConnectionTag) -> Self {
        Self {
            tag,
            holders: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Tag of the holders managed here.
    #[must_use]
    pub const fn tag(&self) -> &ConnectionTag {
        &self.tag
    }

    /// Adds (or replaces) a binding.
    ///
    /// # Errors
    /// Returns [`RegistrationError::TagMismatch`] when the holder is not a
    /// managed connection.
    pub async fn register(
        &self,
        name: impl Into<String>,
        holder: Arc<dyn TokenHolder>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if holder.connection_tag() != &self.tag {
            return Err(RegistrationError::TagMismatch {
                name,
                expected: self.tag.clone(),
                actual: holder.connection_tag().clone(),
            });
        }
        let mut holders = self.holders.write().await;
        holders.insert(name, holder);
        Ok(())
    }

    /// Removes a binding.
    pub async fn unregister(&self, name: &str) -> Option<Arc<dyn TokenHolder>> {
        let mut holders = self.holders.write().await;
        holders.remove(name)
    }

    /// Get all binding names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let holders = self.holders.read().await;
        holders.keys().cloned().collect()
    }

    /// Get count of registered holders.
    pub async fn len(&self) -> usize {
        let holders = self.holders.read().await;
        holders.len()
    }

    /// Returns true if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionRegistry for HolderRegistry {
    async fn publish(&self, token: &Token) -> Result<PublishReport, PublishError> {
        let holders = self.holders.read().await;
        let mut report = PublishReport::default();
        for holder in holders.values() {
            report.matched += 1;
            if holder.token().as_ref() != Some(token) {
                holder.set_token(token);
                report.updated += 1;
            }
        }
        Ok(report)
    }
}
