use anyhow::{Context, Result};
use kanlab_core::AuthError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::provider::{snapshot, ClientConfig, CredentialProvider};

/// On-disk credential file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(rename = "gitlab-url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "gitlab-token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// File-based credential storage.
///
/// Credentials live in a JSON file, by default
/// `<config_dir>/kanlab/credentials.json`. The file is re-read on every
/// lookup so edits from other processes are picked up without a restart.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the user's config directory
    pub fn default_location() -> Result<Self> {
        let dir = kanlab_core::Config::config_dir()?;
        Ok(Self::new(dir.join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write credentials, replacing whatever was stored before.
    ///
    /// The new contents go to a temp file in the same directory, which is
    /// then renamed over the target, so concurrent readers see either the
    /// old file or the new one. The temp file is created owner-only.
    pub fn store(&self, credentials: &StoredCredentials) -> Result<(), AuthError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .map_err(|e| AuthError::StorageError(format!("create {:?}: {}", parent, e)))?;

        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| AuthError::StorageError(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| AuthError::StorageError(format!("temp file in {:?}: {}", parent, e)))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| AuthError::StorageError(format!("write {:?}: {}", tmp.path(), e)))?;
        tmp.persist(&self.path)
            .map_err(|e| AuthError::StorageError(format!("replace {:?}: {}", self.path, e.error)))?;

        tracing::info!("Stored GitLab credentials at {:?}", self.path);
        Ok(())
    }

    /// Read stored credentials; a missing file is `AuthError::NotFound`
    pub fn load(&self) -> Result<StoredCredentials, AuthError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(AuthError::StorageError(e.to_string())),
        };

        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {:?}", self.path))
            .map_err(|e| AuthError::InvalidCredentials(format!("{:#}", e)))
    }

    /// Remove the credential file if present
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Deleted GitLab credentials at {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::StorageError(e.to_string())),
        }
    }

    fn load_or_empty(&self) -> StoredCredentials {
        match self.load() {
            Ok(credentials) => credentials,
            Err(AuthError::NotFound(_)) => StoredCredentials::default(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable credential file: {}", e);
                StoredCredentials::default()
            }
        }
    }
}

impl CredentialProvider for FileCredentialStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn token(&self) -> Option<String> {
        self.load_or_empty().token
    }

    fn base_url(&self) -> Option<String> {
        self.load_or_empty().url
    }

    fn client_config(&self) -> Option<ClientConfig> {
        let stored = self.load_or_empty();
        snapshot(self.name(), stored.url, stored.token)
    }
}
