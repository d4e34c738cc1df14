//! The token refresh cycle.

mod scheduler;
mod status;

pub use scheduler::{RefreshHandle, RefreshScheduler};
pub use status::RefreshStatus;
