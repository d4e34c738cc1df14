//! Keycloak credential provider.
//!
//! Logs in with the `OAuth2` device authorization grant against a Keycloak
//! realm and renews with the refresh token grant. Endpoints are taken from
//! the realm's OIDC discovery document.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokenrelay_application::ports::{
    Clock, CredentialError, CredentialProvider, LoginOutcome, RenewOutcome,
};
use tokenrelay_domain::{IdentitySettings, MinValidity, SslRequired, Token, TokenSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::{Host, Url};

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Grant type of the device authorization flow.
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Added to the polling interval on every `slow_down` answer.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Shortest wait between device token polls.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(default_poll_interval());

/// Token response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `OAuth2` error response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenErrorResponse {
    fn describe(self) -> String {
        match self.error_description {
            Some(description) => format!("{}: {description}", self.error),
            None => self.error,
        }
    }
}

/// Subset of the realm discovery document.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    token_endpoint: String,
    #[serde(default)]
    device_authorization_endpoint: Option<String>,
}

/// Answer of the token endpoint.
enum Grant {
    Issued(TokenResponse),
    Denied(TokenErrorResponse),
}

#[derive(Debug, Clone)]
struct Endpoints {
    token: Url,
    device_authorization: Url,
}

/// Device authorization issued by the realm, shown to the user during login.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    device_code: String,
    /// Code the user types on the verification page.
    pub user_code: String,
    /// Page where the user signs in.
    pub verification_uri: String,
    /// Verification page with the user code already filled in.
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Minimum seconds between token polls.
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
}

const fn default_poll_interval() -> u64 {
    5
}

impl DeviceAuthorization {
    /// Link to open, preferring the pre-filled variant.
    #[must_use]
    pub fn link(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

type Prompt = Arc<dyn Fn(&DeviceAuthorization) + Send + Sync>;

/// Credential provider backed by a Keycloak realm.
pub struct KeycloakProvider {
    settings: IdentitySettings,
    http_client: reqwest::Client,
    clock: Arc<dyn Clock>,
    prompt: Prompt,
    min_poll_interval: Duration,
    endpoints: RwLock<Option<Endpoints>>,
    tokens: RwLock<Option<TokenSet>>,
}

impl fmt::Debug for KeycloakProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeycloakProvider")
            .field("realm", &self.settings.realm)
            .field("client_id", &self.settings.client_id)
            .field("logged_in", &self.tokens.read().is_some())
            .finish_non_exhaustive()
    }
}

impl KeycloakProvider {
    /// Creates a provider for the configured realm.
    ///
    /// The device login prompt goes to stderr; see [`Self::with_prompt`].
    #[must_use]
    pub fn new(settings: IdentitySettings, clock: Arc<dyn Clock>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            settings,
            http_client,
            clock,
            prompt: Arc::new(print_prompt),
            min_poll_interval: MIN_POLL_INTERVAL,
            endpoints: RwLock::new(None),
            tokens: RwLock::new(None),
        }
    }

    /// Replaces the callback that shows the device code to the user.
    #[must_use]
    pub fn with_prompt(
        mut self,
        prompt: impl Fn(&DeviceAuthorization) + Send + Sync + 'static,
    ) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    /// Lowers the floor applied to the realm's device polling interval.
    #[must_use]
    pub const fn with_min_poll_interval(mut self, floor: Duration) -> Self {
        self.min_poll_interval = floor;
        self
    }

    /// Current token bundle, if logged in.
    #[must_use]
    pub fn token_set(&self) -> Option<TokenSet> {
        self.tokens.read().clone()
    }

    fn endpoints(&self) -> Result<Endpoints, CredentialError> {
        self.endpoints.read().clone().ok_or_else(|| {
            CredentialError::Initialization("identity provider is not initialized".to_string())
        })
    }

    /// Enforces the realm's `ssl-required` policy on `url`.
    fn check_transport(&self, url: &Url) -> Result<(), CredentialError> {
        if url.scheme() == "https" {
            return Ok(());
        }
        let allowed = match self.settings.ssl_required {
            SslRequired::None => true,
            SslRequired::External => url.host().is_some_and(|host| is_local(&host)),
            SslRequired::All => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(CredentialError::Initialization(format!(
                "{url} is not https but the realm requires SSL"
            )))
        }
    }

    fn client_params<'a>(&'a self, params: &mut Vec<(&'a str, &'a str)>) {
        params.push(("client_id", self.settings.client_id.as_str()));
        if let Some(secret) = self.settings.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }
    }

    async fn post_form(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, CredentialError> {
        let body = serde_urlencoded::to_string(params).map_err(|e| {
            CredentialError::InvalidResponse(format!("failed to encode form: {e}"))
        })?;

        debug!(%url, "posting form");
        self.http_client
            .post(url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| CredentialError::Network(e.to_string()))
    }

    async fn request_token(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<Grant, CredentialError> {
        let response = self.post_form(url, params).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CredentialError::Network(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&text).map(Grant::Issued).map_err(|e| {
                CredentialError::InvalidResponse(format!("failed to parse token response: {e}"))
            });
        }

        serde_json::from_str(&text).map(Grant::Denied).map_err(|_| {
            CredentialError::Rejected(format!("token request failed with {status}: {text}"))
        })
    }

    fn store(&self, response: TokenResponse) -> Result<(), CredentialError> {
        let access_token = Token::new(response.access_token)
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;

        let refresh_token = response
            .refresh_token
            .or_else(|| self.token_set().and_then(|previous| previous.refresh_token));
        let set = TokenSet::new(
            access_token,
            refresh_token,
            response.expires_in,
            self.clock.now(),
        );
        debug!(
            token = %set.access_token.preview(),
            expires_in = ?set.seconds_until_expiry(set.obtained_at),
            "token stored"
        );
        *self.tokens.write() = Some(set);
        Ok(())
    }

    async fn authorize_device(
        &self,
        endpoints: &Endpoints,
    ) -> Result<DeviceAuthorization, CredentialError> {
        self.check_transport(&endpoints.device_authorization)?;
        let mut params = vec![("scope", "openid")];
        self.client_params(&mut params);

        let response = self
            .post_form(&endpoints.device_authorization, &params)
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&text)
                .map_or_else(|_| format!("{status}: {text}"), TokenErrorResponse::describe);
            return Err(CredentialError::Rejected(format!(
                "device authorization failed: {message}"
            )));
        }

        response.json().await.map_err(|e| {
            CredentialError::InvalidResponse(format!("failed to parse device authorization: {e}"))
        })
    }
}

#[async_trait]
impl CredentialProvider for KeycloakProvider {
    async fn initialize(&self) -> Result<(), CredentialError> {
        let realm_url = self
            .settings
            .realm_url()
            .map_err(|e| CredentialError::Initialization(e.to_string()))?;
        let discovery_url = self
            .settings
            .discovery_url()
            .map_err(|e| CredentialError::Initialization(e.to_string()))?;
        self.check_transport(&discovery_url)?;

        debug!(url = %discovery_url, "fetching realm discovery document");
        let response = self
            .http_client
            .get(discovery_url.clone())
            .send()
            .await
            .map_err(|e| CredentialError::Initialization(format!("{discovery_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(CredentialError::Initialization(format!(
                "{discovery_url} returned {}",
                response.status()
            )));
        }
        let document: DiscoveryDocument = response.json().await.map_err(|e| {
            CredentialError::Initialization(format!("invalid discovery document: {e}"))
        })?;

        let token = Url::parse(&document.token_endpoint)
            .map_err(|e| CredentialError::Initialization(format!("token endpoint: {e}")))?;
        let device_authorization = match document.device_authorization_endpoint {
            Some(raw) => Url::parse(&raw),
            None => realm_url.join("protocol/openid-connect/auth/device"),
        }
        .map_err(|e| CredentialError::Initialization(format!("device endpoint: {e}")))?;
        self.check_transport(&token)?;
        self.check_transport(&device_authorization)?;

        *self.endpoints.write() = Some(Endpoints {
            token,
            device_authorization,
        });
        info!(realm = %self.settings.realm, client_id = %self.settings.client_id, "identity provider initialized");
        Ok(())
    }

    async fn login(&self) -> Result<LoginOutcome, CredentialError> {
        let endpoints = self.endpoints()?;
        let device = self.authorize_device(&endpoints).await?;
        (self.prompt)(&device);

        // An expiry too large to represent never ends the wait.
        let deadline = Instant::now().checked_add(Duration::from_secs(device.expires_in));
        let mut interval = Duration::from_secs(device.interval).max(self.min_poll_interval);

        loop {
            tokio::time::sleep(interval).await;
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!("device code expired before the user signed in");
                return Ok(LoginOutcome::NotAuthenticated);
            }

            let mut params = vec![
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", device.device_code.as_str()),
            ];
            self.client_params(&mut params);

            match self.request_token(&endpoints.token, &params).await? {
                Grant::Issued(response) => {
                    self.store(response)?;
                    return Ok(LoginOutcome::Authenticated);
                }
                Grant::Denied(denied) => match denied.error.as_str() {
                    "authorization_pending" => debug!("waiting for the user to sign in"),
                    "slow_down" => {
                        interval = interval.saturating_add(SLOW_DOWN_STEP);
                        debug!(?interval, "identity provider asked to slow down");
                    }
                    "access_denied" | "expired_token" => {
                        info!(reason = %denied.error, "user did not sign in");
                        return Ok(LoginOutcome::NotAuthenticated);
                    }
                    _ => return Err(CredentialError::Rejected(denied.describe())),
                },
            }
        }
    }

    async fn current_token(&self) -> Option<Token> {
        self.token_set().map(|set| set.access_token)
    }

    async fn renew(&self, min_validity: MinValidity) -> Result<RenewOutcome, CredentialError> {
        let current = self.token_set().ok_or(CredentialError::NoToken)?;
        if !current.needs_renewal(min_validity, self.clock.now()) {
            debug!(?min_validity, "token still valid, renewal skipped");
            return Ok(RenewOutcome::StillValid);
        }
        let refresh_token = current
            .refresh_token
            .ok_or(CredentialError::RenewalUnsupported)?;
        let endpoints = self.endpoints()?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        self.client_params(&mut params);

        match self.request_token(&endpoints.token, &params).await? {
            Grant::Issued(response) => {
                self.store(response)?;
                Ok(RenewOutcome::Refreshed)
            }
            Grant::Denied(denied) => {
                warn!(error = %denied.error, "refresh token rejected");
                Err(CredentialError::Rejected(denied.describe()))
            }
        }
    }
}

/// Loopback, private and `*.localhost` hosts count as internal.
fn is_local(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => *domain == "localhost" || domain.ends_with(".localhost"),
        Host::Ipv4(ip) => ip.is_loopback() || ip.is_private() || ip.is_link_local(),
        Host::Ipv6(ip) => ip.is_loopback(),
    }
}

fn print_prompt(device: &DeviceAuthorization) {
    eprintln!(
        "To sign in, open {} and enter the code {}",
        device.link(),
        device.user_code
    );
}
