//! Token refresh scheduler.
//!
//! After a successful login the scheduler publishes the current token, then
//! runs a strict chain on a spawned task: wait one interval, force a silent
//! renewal, publish the new token, repeat. The next wait only starts after
//! the previous renewal has settled, so at most one renewal is outstanding
//! and renewal latency adds to the period. The first renewal failure moves
//! the run to `Failed`, shows a notice and ends the task.

use std::sync::Arc;
use std::time::Duration;

use tokenrelay_domain::{MinValidity, Notice, RefreshState, RunId, Token};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::RefreshStatus;
use crate::ports::{Clock, CredentialError, CredentialProvider, Notifier, SessionRegistry};

/// Starts refresh runs over a set of ports.
pub struct RefreshScheduler {
    provider: Arc<dyn CredentialProvider>,
    registry: Arc<dyn SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl RefreshScheduler {
    /// Creates a scheduler.
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

    /// Publishes the current token, then schedules the first renewal after
    /// `interval`.
    ///
    /// The caller must already have completed a successful login. The
    /// returned handle observes the run; there is no way to cancel it other
    /// than a renewal failure or dropping the runtime.
    pub async fn start(self, interval: Duration) -> RefreshHandle {
        let run_id = RunId::generate();
        let span = info_span!("refresh", %run_id);
        let (status_tx, status_rx) = watch::channel(RefreshStatus::active());

        let cycle = RefreshCycle {
            provider: self.provider,
            registry: self.registry,
            notifier: self.notifier,
            clock: self.clock,
            status: status_tx,
            interval,
        };

        async {
            info!(?interval, "refresh cycle active");
            cycle.publish_token().await;
        }
        .instrument(span.clone())
        .await;

        let task = tokio::spawn(cycle.run().instrument(span));

        RefreshHandle {
            run_id,
            status: status_rx,
            task,
        }
    }
}

struct RefreshCycle {
    provider: Arc<dyn CredentialProvider>,
    registry: Arc<dyn SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    status: watch::Sender<RefreshStatus>,
    interval: Duration,
}

impl RefreshCycle {
    async fn run(self) {
        loop {
            tokio::time::sleep(self.interval).await;
            if !self.on_interval_elapsed().await {
                break;
            }
        }
        debug!("refresh cycle stopped");
    }

    /// One timer firing. Returns false once the run has failed.
    async fn on_interval_elapsed(&self) -> bool {
        debug!("renewing token");
        let renewed = match self.provider.renew(MinValidity::Force).await {
            Ok(_) => self
                .provider
                .current_token()
                .await
                .ok_or(CredentialError::NoToken),
            Err(err) => Err(err),
        };

        match renewed {
            Ok(token) => {
                self.status.send_modify(|status| status.renewals += 1);
                info!(token = %token.preview(), "token renewed");
                self.publish(&token).await;
                true
            }
            Err(err) => {
                error!(error = %err, "token renewal failed, a new login is required");
                self.enter(RefreshState::Failed);
                self.notifier.notify(Notice::RenewalFailed).await;
                false
            }
        }
    }

    async fn publish_token(&self) {
        if let Some(token) = self.provider.current_token().await {
            self.publish(&token).await;
        } else {
            warn!("no token available to publish");
            self.status.send_modify(|status| status.publish_failures += 1);
        }
    }

    async fn publish(&self, token: &Token) {
        match self.registry.publish(token).await {
            Ok(report) => {
                let now = self.clock.now();
                self.status.send_modify(|status| {
                    status.publishes += 1;
                    status.last_published_at = Some(now);
                });
                debug!(
                    matched = report.matched,
                    updated = report.updated,
                    "token published"
                );
            }
            Err(err) => {
                // Kept active: the next renewal publishes again.
                warn!(error = %err, "could not publish token to the session");
                self.status.send_modify(|status| status.publish_failures += 1);
            }
        }
    }

    fn enter(&self, next: RefreshState) {
        self.status
            .send_modify(|status| match status.state.transition(next) {
                Ok(state) => status.state = state,
                Err(err) => warn!(error = %err, "ignoring refresh state change"),
            });
    }
}

/// Handle to a running refresh cycle.
#[derive(Debug)]
pub struct RefreshHandle {
    run_id: RunId,
    status: watch::Receiver<RefreshStatus>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Identifier of this run, as used in log spans.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Latest status snapshot.
    #[must_use]
    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RefreshStatus> {
        self.status.clone()
    }

    /// Returns true once the cycle has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the cycle to stop and returns its final status.
    pub async fn join(self) -> RefreshStatus {
        if let Err(err) = self.task.await {
            error!(run_id = %self.run_id, error = %err, "refresh task ended abnormally");
        }
        self.status.borrow().clone()
    }
}
