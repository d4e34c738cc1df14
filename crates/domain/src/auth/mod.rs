//! Authentication domain types

mod types;

pub use types::{MinValidity, Token, TokenSet};
