//! Tokenrelay Domain - Core types
//!
//! This crate defines the domain model of the notebook token relay:
//! bearer tokens, the refresh cycle state machine, user notices and
//! settings. All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod connection;
pub mod error;
pub mod id;
pub mod notice;
pub mod settings;
pub mod state;

pub use auth::{MinValidity, Token, TokenSet};
pub use connection::{ConnectionTag, DEFAULT_CONNECTION_TAG};
pub use error::{DomainError, DomainResult};
pub use id::RunId;
pub use notice::Notice;
pub use settings::{
    BridgeSettings, IdentitySettings, NoticeSettings, RefreshSettings, SessionSettings,
    SslRequired,
};
pub use state::RefreshState;
