//! GitLab client error types.

use kanlab_core::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitLabError {
    /// No usable URL or token from the credential source
    #[error("GitLab URL or token is not configured")]
    ConfigurationMissing,

    #[error("Failed to reach GitLab: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("GitLab API error ({status} {status_text}): {body}")]
    Remote {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Unexpected response from GitLab: {0}")]
    Decode(String),

    #[error("Invalid GitLab URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GitLabError {
    pub fn is_configuration_missing(&self) -> bool {
        matches!(self, Self::ConfigurationMissing)
    }

    /// HTTP status for `Remote` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<GitLabError> for AppError {
    fn from(err: GitLabError) -> Self {
        match err {
            GitLabError::ConfigurationMissing => {
                ConfigError::MissingSetting("gitlab url/token".to_string()).into()
            }
            GitLabError::Transport(e) => e.into_network_error().into(),
            GitLabError::Remote { status, body, .. } => NetworkError::ServerError {
                status,
                message: body,
            }
            .into(),
            GitLabError::Decode(msg) => NetworkError::InvalidResponse(msg).into(),
            GitLabError::InvalidUrl(e) => ConfigError::Invalid(e.to_string()).into(),
        }
    }
}
