//! Credential providers.

mod keycloak_provider;
mod static_provider;

pub use keycloak_provider::{DeviceAuthorization, KeycloakProvider};
pub use static_provider::StaticTokenProvider;
