//! Tokenrelay Application - Use cases and ports
//!
//! This crate defines the application layer with:
//! - Port traits for the identity provider, the host session and notices
//! - The token refresh cycle
//! - The bridge use case tying login to publishing

pub mod error;
pub mod ports;
pub mod refresh;
pub mod session;
pub mod use_cases;

#[cfg(test)]
mod test_support;

pub use error::{ApplicationError, ApplicationResult};
pub use ports::{
    Clock, CredentialError, CredentialProvider, LoginOutcome, Notifier, PublishError,
    PublishReport, RenewOutcome, SessionRegistry, TokenHolder,
};
pub use refresh::{RefreshHandle, RefreshScheduler, RefreshStatus};
pub use session::{HolderRegistry, RegistrationError};
pub use use_cases::{BridgeOutcome, RunBridge};
