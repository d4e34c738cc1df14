//! Run bridge use case: initialize, log in, then keep the session supplied
//! with a fresh token.

use std::sync::Arc;
use std::time::Duration;

use tokenrelay_domain::{Notice, RefreshState};
use tracing::{error, info};

use crate::error::ApplicationResult;
use crate::ports::{
    Clock, CredentialError, CredentialProvider, LoginOutcome, Notifier, PublishReport,
    SessionRegistry,
};
use crate::refresh::{RefreshHandle, RefreshScheduler};

/// How a bridge run ended up.
#[derive(Debug)]
pub enum BridgeOutcome {
    /// Login succeeded and the refresh cycle is running.
    Running(RefreshHandle),
    /// The provider cannot renew; its token was published once.
    Published(PublishReport),
    /// The user did not authenticate.
    LoginFailed,
    /// The provider could not be set up.
    InitializationFailed,
}

impl BridgeOutcome {
    /// Returns true if the run ended without a token.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::LoginFailed | Self::InitializationFailed)
    }
}

/// Use case that wires the credential provider to the session.
pub struct RunBridge {
    provider: Arc<dyn CredentialProvider>,
    registry: Arc<dyn SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl RunBridge {
    /// Creates a new `RunBridge` use case.
    #[must_use]
    pub fn new(
        provider: Arc<dyn CredentialProvider>,
        registry: Arc<dyn SessionRegistry>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            registry,
            notifier,
            clock,
        }
    }

    /// Runs initialization and login, then publishes the token.
    ///
    /// Initialization and login failures are reported through the notifier
    /// and returned as outcomes; the registry is not touched in that case.
    ///
    /// # Errors
    /// Returns an error when a non-renewable provider has no token or the
    /// one-off publish fails.
    pub async fn execute(self, interval: Duration) -> ApplicationResult<BridgeOutcome> {
        let state = RefreshState::Authenticating;

        if let Err(err) = self.provider.initialize().await {
            error!(error = %err, "credential provider initialization failed");
            state.transition(RefreshState::Failed)?;
            self.notifier.notify(Notice::InitializationFailed).await;
            return Ok(BridgeOutcome::InitializationFailed);
        }

        match self.provider.login().await {
            Ok(LoginOutcome::Authenticated) => {}
            Ok(LoginOutcome::NotAuthenticated) => {
                info!("user did not authenticate");
                return self.login_failed(state).await;
            }
            Err(err) => {
                error!(error = %err, "login failed");
                return self.login_failed(state).await;
            }
        }

        let state = state.transition(RefreshState::Active)?;
        info!(%state, "login succeeded");
        self.notifier.notify(Notice::LoginSucceeded).await;

        if !self.provider.supports_renewal() {
            let token = self
                .provider
                .current_token()
                .await
                .ok_or(CredentialError::NoToken)?;
            let report = self.registry.publish(&token).await?;
            info!(
                matched = report.matched,
                updated = report.updated,
                "static token published"
            );
            return Ok(BridgeOutcome::Published(report));
        }

        let handle = RefreshScheduler::new(self.provider, self.registry, self.notifier, self.clock)
            .start(interval)
            .await;
        Ok(BridgeOutcome::Running(handle))
    }

    async fn login_failed(&self, state: RefreshState) -> ApplicationResult<BridgeOutcome> {
        state.transition(RefreshState::Failed)?;
        self.notifier.notify(Notice::LoginFailed).await;
        Ok(BridgeOutcome::LoginFailed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ApplicationError;
    use crate::test_support::{
        FixedClock, RecordingNotifier, RecordingRegistry, ScriptedProvider, Step,
    };
    use pretty_assertions::assert_eq;

    const INTERVAL: Duration = Duration::from_millis(60_000);

    fn bridge(
        provider: &Arc<ScriptedProvider>,
        registry: &Arc<RecordingRegistry>,
        notifier: &Arc<RecordingNotifier>,
    ) -> RunBridge {
        RunBridge::new(
            provider.clone(),
            registry.clone(),
            notifier.clone(),
            FixedClock::epoch(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialization_failure() {
        let provider = ScriptedProvider::failing_init();
        let registry = RecordingRegistry::new();
        let notifier = RecordingNotifier::new();

        let outcome = bridge(&provider, &registry, &notifier)
            .execute(INTERVAL)
            .await
            .unwrap();

        assert!(matches!(outcome, BridgeOutcome::InitializationFailed));
        assert!(outcome.is_failure());
        assert_eq!(notifier.notices(), vec![Notice::InitializationFailed]);
        assert!(registry.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_failure_leaves_session_untouched() {
        let provider = ScriptedProvider::rejecting_login();
        let registry = RecordingRegistry::new();
        let notifier = RecordingNotifier::new();

        let outcome = bridge(&provider, &registry, &notifier)
            .execute(INTERVAL)
            .await
            .unwrap();
        tokio::time::sleep(INTERVAL * 3).await;

        assert!(matches!(outcome, BridgeOutcome::LoginFailed));
        assert_eq!(notifier.notices(), vec![Notice::LoginFailed]);
        assert!(registry.published().is_empty());
        assert!(provider.renewals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_login_starts_refresh() {
        let provider = ScriptedProvider::new("T0", [Step::Renew("T1")]);
        let registry = RecordingRegistry::new();
        let notifier = RecordingNotifier::new();

        let outcome = bridge(&provider, &registry, &notifier)
            .execute(INTERVAL)
            .await
            .unwrap();

        let BridgeOutcome::Running(handle) = outcome else {
            panic!("expected a running refresh cycle");
        };
        assert_eq!(notifier.notices(), vec![Notice::LoginSucceeded]);
        assert_eq!(registry.published(), vec!["T0"]);

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(registry.published(), vec!["T0", "T1"]);
        assert_eq!(handle.status().renewals, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_failure_after_login() {
        let provider = ScriptedProvider::new("T0", [Step::Fail]);
        let registry = RecordingRegistry::new();
        let notifier = RecordingNotifier::new();

        let outcome = bridge(&provider, &registry, &notifier)
            .execute(INTERVAL)
            .await
            .unwrap();
        let BridgeOutcome::Running(handle) = outcome else {
            panic!("expected a running refresh cycle");
        };
        let status = handle.join().await;

        assert_eq!(status.state, RefreshState::Failed);
        assert_eq!(
            notifier.notices(),
            vec![Notice::LoginSucceeded, Notice::RenewalFailed]
        );
        assert_eq!(registry.published(), vec!["T0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_token_is_published_once() {
        let provider = ScriptedProvider::non_renewable("STATIC");
        let registry = RecordingRegistry::new();
        let notifier = RecordingNotifier::new();

        let outcome = bridge(&provider, &registry, &notifier)
            .execute(INTERVAL)
            .await
            .unwrap();
        tokio::time::sleep(INTERVAL * 3).await;

        assert!(matches!(outcome, BridgeOutcome::Published(_)));
        assert_eq!(registry.published(), vec!["STATIC"]);
        assert!(provider.renewals().is_empty());
    }

    #[tokio::test]
    async fn test_static_publish_failure_is_an_error() {
        let provider = ScriptedProvider::non_renewable("STATIC");
        let registry = RecordingRegistry::new();
        registry.set_failing(true);
        let notifier = RecordingNotifier::new();

        let err = bridge(&provider, &registry, &notifier)
            .execute(INTERVAL)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Publish(_)));
    }
}
