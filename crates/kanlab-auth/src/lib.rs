//! Credential sources for the GitLab client.
//!
//! The client never reaches into ambient storage itself. A
//! [`CredentialProvider`] is chosen once at startup and asked for a fresh
//! [`ClientConfig`] on every request.

pub mod keyring_store;
pub mod provider;
pub mod storage;

pub use keyring_store::KeyringCredentialStore;
pub use provider::{
    ClientConfig, CredentialProvider, DisabledCredentials, EnvCredentials, MemoryCredentials,
    StaticCredentials,
};
pub use storage::{FileCredentialStore, StoredCredentials};

use std::sync::Arc;

use kanlab_core::CredentialSource;

/// Storage key for the instance URL.
pub const URL_KEY: &str = "gitlab-url";
/// Storage key for the personal access token.
pub const TOKEN_KEY: &str = "gitlab-token";

/// Build the provider selected in configuration.
pub fn provider_for(source: CredentialSource) -> anyhow::Result<Arc<dyn CredentialProvider>> {
    let provider: Arc<dyn CredentialProvider> = match source {
        CredentialSource::File => Arc::new(FileCredentialStore::default_location()?),
        CredentialSource::Keyring => Arc::new(KeyringCredentialStore::default()),
        CredentialSource::Env => Arc::new(EnvCredentials::default()),
        CredentialSource::Disabled => Arc::new(DisabledCredentials),
    };
    tracing::debug!("Using {} credential provider", provider.name());
    Ok(provider)
}
