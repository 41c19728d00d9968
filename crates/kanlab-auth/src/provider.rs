use parking_lot::RwLock;

/// Connection settings for one request.
///
/// Only constructed with a non-blank URL and token.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    token: String,
}

impl ClientConfig {
    /// Returns `None` if either value is blank.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Option<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let token = token.into().trim().to_string();
        if base_url.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self { base_url, token })
    }

    /// Instance URL, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Root of the REST API: `<base_url>/api/v4`
    pub fn api_root(&self) -> String {
        format!("{}/api/v4", self.base_url)
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Source of GitLab credentials, consulted on every request.
pub trait CredentialProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn token(&self) -> Option<String>;

    fn base_url(&self) -> Option<String>;

    /// Snapshot both values, or `None` if either is absent or blank.
    ///
    /// Providers backed by a single store should override this so both
    /// values come from one read.
    fn client_config(&self) -> Option<ClientConfig> {
        let base_url = self.base_url();
        let token = self.token();
        snapshot(self.name(), base_url, token)
    }
}

pub(crate) fn snapshot(
    provider: &str,
    base_url: Option<String>,
    token: Option<String>,
) -> Option<ClientConfig> {
    let has_url = base_url.as_deref().is_some_and(|u| !u.trim().is_empty());
    let has_token = token.as_deref().is_some_and(|t| !t.trim().is_empty());

    match (base_url, token) {
        (Some(url), Some(token)) if has_url && has_token => ClientConfig::new(url, token),
        _ => {
            if !has_token {
                tracing::warn!(provider, "GitLab token not found");
            }
            if !has_url {
                tracing::warn!(provider, "GitLab URL not found");
            }
            None
        }
    }
}

/// Fixed credentials, mostly for tests and one-off invocations.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    base_url: Option<String>,
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            token: Some(token.into()),
        }
    }

    /// Credentials with nothing set
    pub fn empty() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn name(&self) -> &'static str {
        "static"
    }

    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    base_url: Option<String>,
    token: Option<String>,
}

/// In-process credentials that can be rotated while the client is live.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    state: RwLock<MemoryState>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both values at once
    pub fn set(&self, base_url: impl Into<String>, token: impl Into<String>) {
        let mut state = self.state.write();
        state.base_url = Some(base_url.into());
        state.token = Some(token.into());
        tracing::info!("GitLab credentials updated");
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.base_url = None;
        state.token = None;
        tracing::info!("GitLab credentials cleared");
    }
}

impl CredentialProvider for MemoryCredentials {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    fn base_url(&self) -> Option<String> {
        self.state.read().base_url.clone()
    }

    fn client_config(&self) -> Option<ClientConfig> {
        let (base_url, token) = {
            let state = self.state.read();
            (state.base_url.clone(), state.token.clone())
        };
        snapshot(self.name(), base_url, token)
    }
}

/// Reads credentials from environment variables on every call.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    url_var: String,
    token_var: String,
}

impl EnvCredentials {
    pub const DEFAULT_URL_VAR: &'static str = "GITLAB_URL";
    pub const DEFAULT_TOKEN_VAR: &'static str = "GITLAB_TOKEN";

    pub fn with_vars(url_var: impl Into<String>, token_var: impl Into<String>) -> Self {
        Self {
            url_var: url_var.into(),
            token_var: token_var.into(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::with_vars(Self::DEFAULT_URL_VAR, Self::DEFAULT_TOKEN_VAR)
    }
}

impl CredentialProvider for EnvCredentials {
    fn name(&self) -> &'static str {
        "env"
    }

    fn token(&self) -> Option<String> {
        std::env::var(&self.token_var).ok()
    }

    fn base_url(&self) -> Option<String> {
        std::env::var(&self.url_var).ok()
    }
}

/// Never yields credentials.
///
/// For contexts that must not touch storage or the network, such as
/// rendering passes or dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCredentials;

impl CredentialProvider for DisabledCredentials {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn token(&self) -> Option<String> {
        None
    }

    fn base_url(&self) -> Option<String> {
        None
    }

    fn client_config(&self) -> Option<ClientConfig> {
        None
    }
}
