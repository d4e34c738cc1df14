//! Application use cases (business logic orchestration).

mod run_bridge;

pub use run_bridge::*;
