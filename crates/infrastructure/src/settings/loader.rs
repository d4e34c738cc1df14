//! Layered settings loading.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML settings
//! file, then `TOKENRELAY_*` environment variables (`__` separates nested
//! keys, e.g. `TOKENRELAY_REFRESH__INTERVAL_MS=60000`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use thiserror::Error;
use tokenrelay_domain::{BridgeSettings, DomainError};
use tracing::debug;

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "TOKENRELAY";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// The merged settings are inconsistent.
    #[error("invalid settings: {0}")]
    Invalid(#[from] DomainError),
}

/// Builds [`BridgeSettings`] from defaults, a file and the environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    env: Option<config::Map<String, String>>,
}

impl SettingsLoader {
    /// Loader using the default file location and the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads this file instead of the default one. The file must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Uses these variables instead of the process environment.
    #[must_use]
    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// `<config dir>/tokenrelay/config.toml`, read when present.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tokenrelay").join("config.toml"))
    }

    /// Merges all sources and validates the result.
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] when an explicit file is missing or a
    /// source is malformed, and [`ConfigError::Invalid`] when validation
    /// fails.
    pub fn load(&self) -> Result<BridgeSettings, ConfigError> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&BridgeSettings::default())?);

        match &self.file {
            Some(path) => {
                debug!(path = %path.display(), "reading settings file");
                builder = builder.add_source(toml_file(path));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    debug!(path = %path.display(), "looking for settings file");
                    builder = builder.add_source(toml_file(&path).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let settings: BridgeSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

fn toml_file(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Toml)
}

/// Copy of `settings` with secrets masked, for display.
#[must_use]
pub fn redacted(settings: &BridgeSettings) -> BridgeSettings {
    const MASK: &str = "***";
    let mut shown = settings.clone();
    for secret in [
        &mut shown.identity.client_secret,
        &mut shown.identity.static_token,
        &mut shown.session.kernel_token,
    ] {
        if secret.is_some() {
            *secret = Some(MASK.to_string());
        }
    }
    shown
}
