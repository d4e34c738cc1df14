//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the refresh core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod credential_provider;
mod notifier;
mod session_registry;

pub use clock::Clock;
pub use credential_provider::{CredentialError, CredentialProvider, LoginOutcome, RenewOutcome};
pub use notifier::Notifier;
pub use session_registry::{PublishError, PublishReport, SessionRegistry, TokenHolder};
