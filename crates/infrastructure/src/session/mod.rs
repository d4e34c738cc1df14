//! Host session adapters.

mod kernel_registry;
mod managed_connection;

pub use kernel_registry::KernelExecRegistry;
pub use managed_connection::ManagedConnection;
