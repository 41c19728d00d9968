use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Where GitLab credentials are read from at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// JSON credentials file in the config directory
    #[default]
    File,
    /// OS keyring
    Keyring,
    /// `GITLAB_URL` / `GITLAB_TOKEN` environment variables
    Env,
    /// No credentials; every read comes back empty and writes are rejected
    Disabled,
}

/// What the board-lists lookup does when one of its requests fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoardFailurePolicy {
    /// Log the failure and return an empty list
    #[default]
    Degrade,
    /// Return the failure to the caller
    Propagate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub boards: BoardsConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// Instance URL without the `/api/v4` suffix, e.g. `https://gitlab.com`.
    /// Used as the default for `kanlab login`; the credential source stays
    /// authoritative at request time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub credential_source: CredentialSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardsConfig {
    #[serde(default)]
    pub failure_policy: BoardFailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Allow invalid/self-signed certificates (DEVELOPMENT ONLY)
    ///
    /// Only takes effect in debug builds.
    #[serde(default)]
    pub allow_invalid_certs: bool,
}

fn default_user_agent() -> String {
    concat!("kanlab/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            allow_invalid_certs: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match self.gitlab.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Self::validate_url(url, "gitlab.url", &mut result),
            _ => {
                if self.gitlab.credential_source != CredentialSource::Disabled {
                    result.add_warning(
                        "gitlab.url",
                        "GitLab URL not set - it must come from the credential source",
                    );
                }
            }
        }

        if self.http.user_agent.trim().is_empty() {
            result.add_error("http.user_agent", "User agent must not be empty");
        }

        if self.http.allow_invalid_certs {
            result.add_warning(
                "http.allow_invalid_certs",
                "Certificate validation disabled (ignored in release builds)",
            );
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
                if url.path().trim_end_matches('/').ends_with("/api/v4") {
                    result.add_warning(
                        field_name,
                        "URL should not include /api/v4; it is appended automatically",
                    );
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding config and file-based credentials
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Failed to get config directory")?
            .join("kanlab"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
