//! Settings sources.

mod loader;

pub use loader::{ConfigError, ENV_PREFIX, SettingsLoader, redacted};
