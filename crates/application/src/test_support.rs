//! Fakes for the ports, shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokenrelay_domain::{ConnectionTag, MinValidity, Notice, Token};

use crate::ports::{
    Clock, CredentialError, CredentialProvider, LoginOutcome, Notifier, PublishError,
    PublishReport, RenewOutcome, SessionRegistry, TokenHolder,
};

pub fn token(value: &str) -> Token {
    Token::new(value).unwrap()
}

/// One scripted answer to `renew`.
#[derive(Debug, Clone)]
pub enum Step {
    Renew(&'static str),
    Fail,
}

/// Credential provider driven by a script. Once the script runs out,
/// `renew` never completes.
pub struct ScriptedProvider {
    init: Result<(), CredentialError>,
    login: Result<LoginOutcome, CredentialError>,
    renewable: bool,
    token: Mutex<Option<Token>>,
    script: Mutex<VecDeque<Step>>,
    renewals: Mutex<Vec<MinValidity>>,
}

impl ScriptedProvider {
    pub fn new(initial: &str, script: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            init: Ok(()),
            login: Ok(LoginOutcome::Authenticated),
            renewable: true,
            token: Mutex::new(Some(token(initial))),
            script: Mutex::new(script.into_iter().collect()),
            renewals: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_init() -> Arc<Self> {
        Arc::new(Self {
            init: Err(CredentialError::Initialization("no realm".to_string())),
            ..Self::empty()
        })
    }

    pub fn rejecting_login() -> Arc<Self> {
        Arc::new(Self {
            login: Ok(LoginOutcome::NotAuthenticated),
            ..Self::empty()
        })
    }

    pub fn non_renewable(initial: &str) -> Arc<Self> {
        Arc::new(Self {
            renewable: false,
            token: Mutex::new(Some(token(initial))),
            ..Self::empty()
        })
    }

    fn empty() -> Self {
        Self {
            init: Ok(()),
            login: Ok(LoginOutcome::Authenticated),
            renewable: true,
            token: Mutex::new(None),
            script: Mutex::new(VecDeque::new()),
            renewals: Mutex::new(Vec::new()),
        }
    }

    pub fn renewals(&self) -> Vec<MinValidity> {
        self.renewals.lock().clone()
    }
}

#[async_trait]
impl CredentialProvider for ScriptedProvider {
    async fn initialize(&self) -> Result<(), CredentialError> {
        self.init.clone()
    }

    async fn login(&self) -> Result<LoginOutcome, CredentialError> {
        self.login.clone()
    }

    async fn current_token(&self) -> Option<Token> {
        self.token.lock().clone()
    }

    async fn renew(&self, min_validity: MinValidity) -> Result<RenewOutcome, CredentialError> {
        self.renewals.lock().push(min_validity);
        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Renew(value)) => {
                *self.token.lock() = Some(token(value));
                Ok(RenewOutcome::Refreshed)
            }
            Some(Step::Fail) => Err(CredentialError::Rejected("Session not active".to_string())),
            None => std::future::pending().await,
        }
    }

    fn supports_renewal(&self) -> bool {
        self.renewable
    }
}

/// Registry that records every publish call.
#[derive(Default)]
pub struct RecordingRegistry {
    published: Mutex<Vec<Token>>,
    fail: Mutex<bool>,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl SessionRegistry for RecordingRegistry {
    async fn publish(&self, token: &Token) -> Result<PublishReport, PublishError> {
        if *self.fail.lock() {
            return Err(PublishError::Unreachable("kernel is gone".to_string()));
        }
        self.published.lock().push(token.clone());
        Ok(PublishReport {
            matched: 1,
            updated: 1,
        })
    }
}

/// Notifier that records notices.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Clock frozen at a fixed instant.
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn epoch() -> Arc<Self> {
        Arc::new(Self(DateTime::from_timestamp(1_700_000_000, 0).unwrap()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Token holder that counts writes.
pub struct RecordingHolder {
    tag: ConnectionTag,
    token: Mutex<Option<Token>>,
    writes: Mutex<usize>,
}

impl RecordingHolder {
    pub fn new(tag: ConnectionTag) -> Arc<Self> {
        Arc::new(Self {
            tag,
            token: Mutex::new(None),
            writes: Mutex::new(0),
        })
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }
}

impl TokenHolder for RecordingHolder {
    fn connection_tag(&self) -> &ConnectionTag {
        &self.tag
    }

    fn token(&self) -> Option<Token> {
        self.token.lock().clone()
    }

    fn set_token(&self, token: &Token) {
        *self.token.lock() = Some(token.clone());
        *self.writes.lock() += 1;
    }
}
