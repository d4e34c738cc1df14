//! Connection object that carries the bearer token.

use std::fmt;

use parking_lot::RwLock;
use reqwest::header::AUTHORIZATION;
use tokenrelay_application::ports::TokenHolder;
use tokenrelay_domain::{ConnectionTag, Token};
use url::Url;

/// Client-side handle to the query backend.
///
/// Every request built through it carries `Authorization: Bearer <token>`
/// with whatever token was published last.
pub struct ManagedConnection {
    tag: ConnectionTag,
    base_url: Url,
    http_client: reqwest::Client,
    token: RwLock<Option<Token>>,
}

impl fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("tag", &self.tag)
            .field("base_url", &self.base_url.as_str())
            .field("token", &*self.token.read())
            .finish_non_exhaustive()
    }
}

impl ManagedConnection {
    /// Creates a connection with the default tag and no token yet.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self::with_tag(ConnectionTag::default(), base_url)
    }

    /// Creates a connection carrying a custom tag.
    #[must_use]
    pub fn with_tag(tag: ConnectionTag, base_url: Url) -> Self {
        Self {
            tag,
            base_url,
            http_client: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    /// Backend root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `Bearer <token>`, once a token has been published.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        self.token.read().as_ref().map(Token::bearer_header)
    }

    /// Starts a GET request to `path` below the backend root.
    ///
    /// # Errors
    /// Returns an error if `path` cannot be joined onto the base URL.
    pub fn get(&self, path: &str) -> Result<reqwest::RequestBuilder, url::ParseError> {
        let url = self.base_url.join(path)?;
        let request = self.http_client.get(url);
        Ok(match self.authorization_header() {
            Some(header) => request.header(AUTHORIZATION, header),
            None => request,
        })
    }
}

impl TokenHolder for ManagedConnection {
    fn connection_tag(&self) -> &ConnectionTag {
        &self.tag
    }

    fn token(&self) -> Option<Token> {
        self.token.read().clone()
    }

    fn set_token(&self, token: &Token) {
        *self.token.write() = Some(token.clone());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_header_follows_published_token() {
        let connection = ManagedConnection::new(Url::parse("http://localhost:8080/").unwrap());
        assert_eq!(connection.authorization_header(), None);

        connection.set_token(&Token::new("T0").unwrap());
        assert_eq!(connection.authorization_header().as_deref(), Some("Bearer T0"));

        connection.set_token(&Token::new("T1").unwrap());
        assert_eq!(connection.authorization_header().as_deref(), Some("Bearer T1"));
        assert_eq!(connection.connection_tag(), &ConnectionTag::default());
    }

    #[test]
    fn test_debug_hides_token() {
        let connection = ManagedConnection::new(Url::parse("http://localhost:8080/").unwrap());
        connection.set_token(&Token::new("super-secret-token-value").unwrap());
        assert!(!format!("{connection:?}").contains("super-secret-token-value"));
    }

    #[tokio::test]
    async fn test_requests_carry_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/datasets"))
            .and(header("authorization", "Bearer T0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let connection = ManagedConnection::new(Url::parse(&server.uri()).unwrap());
        connection.set_token(&Token::new("T0").unwrap());

        let response = connection.get("api/datasets").unwrap().send().await.unwrap();

        assert!(response.status().is_success());
    }
}
