//! Adapters for small system ports.

mod system_clock;

pub use system_clock::SystemClock;
