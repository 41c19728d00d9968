//! Shared error types.
//!
//! Each variant carries full context for logs; `user_message()` gives the
//! short text shown on the command line.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to reach GitLab. Check your connection and instance URL."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status: 401, .. } => {
                "GitLab rejected the token. Run `kanlab login` again."
            }
            NetworkError::ServerError { status: 403, .. } => {
                "The token lacks permission for this resource."
            }
            NetworkError::ServerError { status: 404, .. } => "Not found on GitLab.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "GitLab is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => "Received an unexpected response from GitLab.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => {
                "GitLab URL or token is not configured. Run `kanlab login` first."
            }
        }
    }
}

/// Credential storage errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credentials not found for service: {0}")]
    NotFound(String),

    #[error("Secure storage error: {0}")]
    StorageError(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NotFound(_) => "Not signed in. Run `kanlab login` first.",
            AuthError::StorageError(_) => "Failed to access stored credentials.",
            AuthError::InvalidCredentials(_) => "Invalid credentials. Check URL and token.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
