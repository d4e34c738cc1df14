//! In-process session registry.
//!
//! Used when the connection objects live in the same process as the relay,
//! and by tests of the refresh cycle.

mod holder_registry;

pub use holder_registry::{HolderRegistry, RegistrationError};
