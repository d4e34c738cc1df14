//! Relay settings.
//!
//! Static values supplied at startup: identity-provider realm, auth-server
//! URL, client id, refresh interval and the host-session endpoint. Loading
//! (files, environment) lives in the infrastructure layer; this module only
//! defines the shape, the defaults and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::connection::ConnectionTag;
use crate::error::{DomainError, DomainResult};

/// Keycloak `ssl-required` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslRequired {
    /// HTTPS for every address.
    All,
    /// HTTPS except for local and private addresses (default).
    #[default]
    External,
    /// HTTPS never enforced.
    None,
}

/// Identity-provider client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Realm name.
    #[serde(default = "default_realm")]
    pub realm: String,

    /// Base URL of the auth server, e.g. `http://auth.localhost/auth/`.
    #[serde(default = "default_auth_server_url")]
    pub auth_server_url: String,

    /// OAuth client id (Keycloak `resource`).
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Client secret for confidential clients.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Whether the client is public (no secret).
    #[serde(default = "default_public_client")]
    pub public_client: bool,

    /// TLS policy for the auth server URL.
    #[serde(default)]
    pub ssl_required: SslRequired,

    /// Fixed token; disables login and renewal entirely.
    #[serde(default)]
    pub static_token: Option<String>,

    /// Per-request timeout for identity-provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_realm() -> String {
    "Ingef".to_string()
}

fn default_auth_server_url() -> String {
    "http://auth.localhost/auth/".to_string()
}

fn default_client_id() -> String {
    "conquery-release".to_string()
}

fn default_public_client() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            realm: default_realm(),
            auth_server_url: default_auth_server_url(),
            client_id: default_client_id(),
            client_secret: None,
            public_client: default_public_client(),
            ssl_required: SslRequired::default(),
            static_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl IdentitySettings {
    /// Auth server base URL, normalized to end with `/`.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or is not http(s).
    pub fn auth_server(&self) -> DomainResult<Url> {
        let mut raw = self.auth_server_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| DomainError::setting("identity.auth_server_url", e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DomainError::setting(
                "identity.auth_server_url",
                format!("unsupported scheme `{other}`"),
            )),
        }
    }

    /// `{auth_server}/realms/{realm}/`.
    ///
    /// # Errors
    /// Propagates [`IdentitySettings::auth_server`] errors.
    pub fn realm_url(&self) -> DomainResult<Url> {
        self.auth_server()?
            .join(&format!("realms/{}/", self.realm.trim()))
            .map_err(|e| DomainError::setting("identity.realm", e.to_string()))
    }

    /// OIDC discovery document of the realm.
    ///
    /// # Errors
    /// Propagates [`IdentitySettings::realm_url`] errors.
    pub fn discovery_url(&self) -> DomainResult<Url> {
        self.realm_url()?
            .join(".well-known/openid-configuration")
            .map_err(|e| DomainError::setting("identity.realm", e.to_string()))
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.static_token.is_some() {
            return Ok(());
        }
        if self.realm.trim().is_empty() {
            return Err(DomainError::setting("identity.realm", "must not be empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(DomainError::setting("identity.client_id", "must not be empty"));
        }
        if !self.public_client && self.client_secret.is_none() {
            return Err(DomainError::setting(
                "identity.client_secret",
                "confidential clients need a secret",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(DomainError::setting(
                "identity.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        let url = self.auth_server()?;
        if self.ssl_required == SslRequired::All && url.scheme() != "https" {
            return Err(DomainError::setting(
                "identity.auth_server_url",
                "ssl_required = all needs an https URL",
            ));
        }
        Ok(())
    }
}

/// Refresh loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Delay between the end of one cycle and the next renewal, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    300_000
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl RefreshSettings {
    /// Returns the refresh interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Host session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Type tag of the connection objects that receive the token.
    #[serde(default)]
    pub connection_type: ConnectionTag,

    /// Base URL of the session's execute endpoint.
    #[serde(default = "default_kernel_url")]
    pub kernel_url: String,

    /// Token for the execute endpoint (`Authorization: token ...`).
    #[serde(default)]
    pub kernel_token: Option<String>,

    /// Per-request timeout for calls to the execute endpoint.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_kernel_url() -> String {
    "http://127.0.0.1:8888/tokenrelay/".to_string()
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connection_type: ConnectionTag::default(),
            kernel_url: default_kernel_url(),
            kernel_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SessionSettings {
    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Kernel base URL, normalized to end with `/`.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or is not http(s).
    pub fn kernel_base(&self) -> DomainResult<Url> {
        let mut raw = self.kernel_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| DomainError::setting("session.kernel_url", e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DomainError::setting(
                "session.kernel_url",
                format!("unsupported scheme `{other}`"),
            )),
        }
    }
}

/// User notice settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NoticeSettings {
    /// Wait for the user to press Enter after each notice.
    #[serde(default)]
    pub acknowledge: bool,
}

/// All relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BridgeSettings {
    /// Identity provider.
    #[serde(default)]
    pub identity: IdentitySettings,
    /// Refresh loop.
    #[serde(default)]
    pub refresh: RefreshSettings,
    /// Host session.
    #[serde(default)]
    pub session: SessionSettings,
    /// User notices.
    #[serde(default)]
    pub notices: NoticeSettings,
}

impl BridgeSettings {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    /// Returns the first [`DomainError::InvalidSetting`] found.
    pub fn validate(&self) -> DomainResult<()> {
        self.identity.validate()?;
        if self.refresh.interval_ms == 0 {
            return Err(DomainError::setting(
                "refresh.interval_ms",
                "must be greater than zero",
            ));
        }
        if self.session.request_timeout_secs == 0 {
            return Err(DomainError::setting(
                "session.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        self.session.kernel_base()?;
        Ok(())
    }
}
