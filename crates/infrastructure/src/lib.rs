//! Tokenrelay Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the Keycloak and static credential
//! providers, the kernel and in-process session registries, the console
//! notifier and layered settings loading.

pub mod adapters;
pub mod auth;
pub mod notify;
pub mod session;
pub mod settings;

pub use adapters::SystemClock;
pub use auth::{DeviceAuthorization, KeycloakProvider, StaticTokenProvider};
pub use notify::ConsoleNotifier;
pub use session::{KernelExecRegistry, ManagedConnection};
pub use settings::{ConfigError, ENV_PREFIX, SettingsLoader, redacted};
