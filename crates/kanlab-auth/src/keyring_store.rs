use kanlab_core::AuthError;

use crate::provider::{snapshot, ClientConfig, CredentialProvider};
use crate::{TOKEN_KEY, URL_KEY};

const DEFAULT_SERVICE: &str = "kanlab";

/// Credentials kept in the OS keyring, one entry per value.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, AuthError> {
        keyring::Entry::new(&self.service, key).map_err(|e| AuthError::StorageError(e.to_string()))
    }

    fn read(&self, key: &str) -> Option<String> {
        let entry = match self.entry(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Keyring unavailable: {}", e);
                return None;
            }
        };

        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!(key, "Failed to read keyring entry: {}", e);
                None
            }
        }
    }

    pub fn store(&self, base_url: &str, token: &str) -> Result<(), AuthError> {
        self.entry(URL_KEY)?
            .set_password(base_url)
            .map_err(|e| AuthError::StorageError(e.to_string()))?;
        self.entry(TOKEN_KEY)?
            .set_password(token)
            .map_err(|e| AuthError::StorageError(e.to_string()))?;

        tracing::info!(service = %self.service, "Stored GitLab credentials in keyring");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        for key in [URL_KEY, TOKEN_KEY] {
            match self.entry(key)?.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(AuthError::StorageError(e.to_string())),
            }
        }
        tracing::info!(service = %self.service, "Deleted GitLab credentials from keyring");
        Ok(())
    }
}

impl CredentialProvider for KeyringCredentialStore {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    fn base_url(&self) -> Option<String> {
        self.read(URL_KEY)
    }

    fn client_config(&self) -> Option<ClientConfig> {
        snapshot(self.name(), self.read(URL_KEY), self.read(TOKEN_KEY))
    }
}
