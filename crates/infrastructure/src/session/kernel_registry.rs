//! Session registry that updates connections inside a running kernel.
//!
//! The kernel's execute endpoint receives a statement that calls
//! `update_token(new_token=...)` on every global of the connection type.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tokenrelay_application::ports::{PublishError, PublishReport, SessionRegistry};
use tokenrelay_domain::{ConnectionTag, DomainError, DomainResult, SessionSettings, Token};
use tracing::debug;
use url::Url;

/// Reply of the execute endpoint.
#[derive(Debug, Default, Deserialize)]
struct ExecuteReply {
    #[serde(default)]
    updated: usize,
}

/// Publishes tokens by executing code in the kernel.
#[derive(Debug, Clone)]
pub struct KernelExecRegistry {
    tag: ConnectionTag,
    execute_url: Url,
    kernel_token: Option<String>,
    http_client: reqwest::Client,
}

impl KernelExecRegistry {
    /// Creates a registry for the configured kernel.
    ///
    /// # Errors
    /// Returns an error if the kernel URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(settings: &SessionSettings) -> DomainResult<Self> {
        let execute_url = settings
            .kernel_base()?
            .join("execute")
            .map_err(|e| DomainError::setting("session.kernel_url", e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| DomainError::setting("session.request_timeout_secs", e.to_string()))?;

        Ok(Self {
            tag: settings.connection_type.clone(),
            execute_url,
            kernel_token: settings.kernel_token.clone(),
            http_client,
        })
    }

    /// Endpoint receiving the statements.
    #[must_use]
    pub const fn execute_url(&self) -> &Url {
        &self.execute_url
    }

    /// Statement that hands `token` to every connection in the kernel.
    ///
    /// The token is written as a JSON string literal, which Python parses
    /// to the same string.
    #[must_use]
    pub fn render_statement(&self, token: &Token) -> String {
        let literal = serde_json::Value::String(token.as_str().to_string());
        format!(
            "[value.update_token(new_token={literal}) for name, value in dict(globals()).items() if isinstance(value, {tag})]",
            tag = self.tag
        )
    }
}

#[async_trait]
impl SessionRegistry for KernelExecRegistry {
    async fn publish(&self, token: &Token) -> Result<PublishReport, PublishError> {
        let mut request = self
            .http_client
            .post(self.execute_url.clone())
            .json(&json!({ "code": self.render_statement(token) }));
        if let Some(kernel_token) = &self.kernel_token {
            request = request.header(AUTHORIZATION, format!("token {kernel_token}"));
        }

        debug!(url = %self.execute_url, token = %token.preview(), "publishing token to kernel");
        let response = request
            .send()
            .await
            .map_err(|e| PublishError::Unreachable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PublishError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected(format!("{status}: {text}")));
        }

        let reply: ExecuteReply = serde_json::from_str(&text).unwrap_or_default();
        Ok(PublishReport {
            matched: reply.updated,
            updated: reply.updated,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(kernel_url: String) -> SessionSettings {
        SessionSettings {
            kernel_url,
            ..SessionSettings::default()
        }
    }

    #[test]
    fn test_render_statement() {
        let registry = KernelExecRegistry::new(&SessionSettings::default()).unwrap();
        let statement = registry.render_statement(&Token::new("T0").unwrap());
        assert_eq!(
            statement,
            r#"[value.update_token(new_token="T0") for name, value in dict(globals()).items() if isinstance(value, ConqueryConnection)]"#
        );
    }

    #[test]
    fn test_render_statement_escapes_token() {
        let registry = KernelExecRegistry::new(&SessionSettings::default()).unwrap();
        let statement = registry.render_statement(&Token::new(r#"a"b\c"#).unwrap());
        assert!(statement.contains(r#"new_token="a\"b\\c")"#));
    }

    #[test]
    fn test_execute_url() {
        let registry =
            KernelExecRegistry::new(&settings("http://127.0.0.1:8888/relay".to_string())).unwrap();
        assert_eq!(registry.execute_url().as_str(), "http://127.0.0.1:8888/relay/execute");
    }

    #[tokio::test]
    async fn test_publish_posts_statement() {
        let server = MockServer::start().await;
        let settings = SessionSettings {
            kernel_token: Some("kt".to_string()),
            ..settings(format!("{}/relay/", server.uri()))
        };
        let registry = KernelExecRegistry::new(&settings).unwrap();
        let token = Token::new("T0").unwrap();
        Mock::given(method("POST"))
            .and(path("/relay/execute"))
            .and(header("authorization", "token kt"))
            .and(body_json(json!({ "code": registry.render_statement(&token) })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": 2 })))
            .expect(1)
            .mount(&server)
            .await;

        let report = registry.publish(&token).await.unwrap();

        assert_eq!(report, PublishReport { matched: 2, updated: 2 });
    }

    #[tokio::test]
    async fn test_publish_rejected_by_kernel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("NameError"))
            .mount(&server)
            .await;
        let registry = KernelExecRegistry::new(&settings(server.uri())).unwrap();

        let err = registry.publish(&Token::new("T0").unwrap()).await.unwrap_err();

        assert!(matches!(err, PublishError::Rejected(message) if message.contains("NameError")));
    }

    #[tokio::test]
    async fn test_publish_times_out_on_silent_kernel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "updated": 1 }))
                    .set_delay(Duration::from_secs(3600)),
            )
            .mount(&server)
            .await;
        let settings = SessionSettings {
            request_timeout_secs: 1,
            ..settings(server.uri())
        };
        let registry = KernelExecRegistry::new(&settings).unwrap();

        let published = tokio::time::timeout(
            Duration::from_secs(10),
            registry.publish(&Token::new("T0").unwrap()),
        )
        .await
        .expect("publish should give up after the request timeout");

        assert!(matches!(published, Err(PublishError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_publish_to_missing_kernel() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);
        let registry = KernelExecRegistry::new(&settings(uri)).unwrap();

        let err = registry.publish(&Token::new("T0").unwrap()).await.unwrap_err();

        assert!(matches!(err, PublishError::Unreachable(_)));
    }
}
