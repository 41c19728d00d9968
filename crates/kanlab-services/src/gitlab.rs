// crates/kanlab-services/src/gitlab.rs

use kanlab_auth::{ClientConfig, CredentialProvider};
use kanlab_core::{BoardFailurePolicy, HttpConfig};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

use crate::error::GitLabError;
use crate::types::{Board, BoardList, Issue, Project, ProjectId, UpdateIssueLabelsRequest};

const PAGE_SIZE: &str = "100";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab REST client.
///
/// Credentials are fetched from the provider on every call, so rotating them
/// takes effect on the next request. Missing credentials make reads return
/// empty lists and make label updates fail with
/// [`GitLabError::ConfigurationMissing`]; no request is sent either way.
///
/// Requests are never retried and no timeout is set beyond reqwest's default.
#[derive(Clone)]
pub struct GitLabClient {
    client: Arc<Client>,
    credentials: Arc<dyn CredentialProvider>,
    board_policy: BoardFailurePolicy,
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("credentials", &self.credentials.name())
            .field("board_policy", &self.board_policy)
            .finish()
    }
}

impl GitLabClient {
    /// Create a client with default HTTP settings
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, GitLabError> {
        Self::with_http_config(credentials, &HttpConfig::default())
    }

    pub fn with_http_config(
        credentials: Arc<dyn CredentialProvider>,
        http: &HttpConfig,
    ) -> Result<Self, GitLabError> {
        let mut builder = Client::builder().user_agent(http.user_agent.as_str());

        if http.allow_invalid_certs {
            if cfg!(debug_assertions) {
                tracing::warn!("Accepting invalid TLS certificates (debug build)");
                builder = builder.danger_accept_invalid_certs(true);
            } else {
                tracing::warn!("allow_invalid_certs is ignored in release builds");
            }
        }

        Ok(Self {
            client: Arc::new(builder.build()?),
            credentials,
            board_policy: BoardFailurePolicy::default(),
        })
    }

    /// Set what `get_project_board_lists` does on failure
    pub fn with_board_policy(mut self, policy: BoardFailurePolicy) -> Self {
        self.board_policy = policy;
        self
    }

    fn config(&self) -> Option<ClientConfig> {
        self.credentials.client_config()
    }

    /// Build an authenticated request for `path` (relative to `/api/v4`)
    fn request(
        &self,
        config: &ClientConfig,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, GitLabError> {
        let url = Url::parse(&format!("{}/{}", config.api_root(), path))?;
        Ok(self
            .client
            .request(method, url)
            .header(TOKEN_HEADER, config.token())
            .header(header::ACCEPT, "application/json"))
    }

    /// Send a request, logging and classifying any failure
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GitLabError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = ?e.url().map(|u| u.path()), "GitLab API request failed: {}", e);
                return Err(GitLabError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                status_text = %status_text,
                body = %body,
                "GitLab API request failed"
            );
            return Err(GitLabError::Remote {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!("Failed to read GitLab response body: {}", e);
            GitLabError::Transport(e)
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("Failed to decode GitLab response: {}", e);
            GitLabError::Decode(e.to_string())
        })
    }

    /// List projects the token's user is a member of (first 100)
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_projects(&self) -> Result<Vec<Project>, GitLabError> {
        let Some(config) = self.config() else {
            return Ok(Vec::new());
        };

        let request = self
            .request(&config, Method::GET, "projects")?
            .query(&[("membership", "true"), ("per_page", PAGE_SIZE)]);

        let projects: Vec<Project> = self.execute(request).await?;
        tracing::info!("Fetched {} projects", projects.len());
        Ok(projects)
    }

    /// List a project's issues (first 100) with full label details
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_project_issues(
        &self,
        project_id: impl Into<ProjectId> + std::fmt::Debug,
    ) -> Result<Vec<Issue>, GitLabError> {
        let project_id = project_id.into();
        let Some(config) = self.config() else {
            return Ok(Vec::new());
        };
        tracing::debug!(project = %project_id, "Fetching issues");

        let path = format!("projects/{}/issues", project_id.to_path_segment());
        let request = self
            .request(&config, Method::GET, &path)?
            .query(&[("per_page", PAGE_SIZE), ("with_labels_details", "true")]);

        let issues: Vec<Issue> = self.execute(request).await?;
        tracing::info!(project = %project_id, "Fetched {} issues", issues.len());
        Ok(issues)
    }

    /// Replace an issue's labels with `labels`.
    ///
    /// Fails with `ConfigurationMissing` when credentials are absent. Every
    /// other failure is returned as well; label edits are never dropped
    /// silently.
    #[tracing::instrument(skip(self, labels), level = "debug")]
    pub async fn update_issue_labels<S: AsRef<str>>(
        &self,
        project_id: impl Into<ProjectId> + std::fmt::Debug,
        issue_iid: u64,
        labels: &[S],
    ) -> Result<Issue, GitLabError> {
        let project_id = project_id.into();
        let Some(config) = self.config() else {
            tracing::error!(project = %project_id, issue_iid, "Cannot update labels: missing GitLab config");
            return Err(GitLabError::ConfigurationMissing);
        };

        let body = UpdateIssueLabelsRequest::new(labels);
        tracing::debug!(project = %project_id, issue_iid, labels = %body.labels, "Updating issue labels");

        let path = format!(
            "projects/{}/issues/{}",
            project_id.to_path_segment(),
            issue_iid
        );
        let request = self.request(&config, Method::PUT, &path)?.json(&body);

        let issue: Issue = self.execute(request).await?;
        tracing::info!(project = %project_id, issue_iid, "Updated issue labels");
        Ok(issue)
    }

    /// Lists of the project's first board.
    ///
    /// Empty when credentials are missing or the project has no boards.
    /// Failures follow the client's [`BoardFailurePolicy`].
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_project_board_lists(
        &self,
        project_id: impl Into<ProjectId> + std::fmt::Debug,
    ) -> Result<Vec<BoardList>, GitLabError> {
        let project_id = project_id.into();
        let Some(config) = self.config() else {
            return Ok(Vec::new());
        };

        match self.fetch_first_board_lists(&config, &project_id).await {
            Ok(lists) => Ok(lists),
            Err(e) => match self.board_policy {
                BoardFailurePolicy::Degrade => {
                    tracing::error!(
                        project = %project_id,
                        "Failed to get board lists for project {}: {}",
                        project_id,
                        e
                    );
                    Ok(Vec::new())
                }
                BoardFailurePolicy::Propagate => Err(e),
            },
        }
    }

    async fn fetch_first_board_lists(
        &self,
        config: &ClientConfig,
        project_id: &ProjectId,
    ) -> Result<Vec<BoardList>, GitLabError> {
        let segment = project_id.to_path_segment();

        let request = self.request(config, Method::GET, &format!("projects/{}/boards", segment))?;
        let boards: Vec<Board> = self.execute(request).await?;

        // The remote's ordering decides; no further disambiguation.
        let Some(board) = boards.first() else {
            tracing::debug!(project = %project_id, "Project has no boards");
            return Ok(Vec::new());
        };

        let path = format!("projects/{}/boards/{}/lists", segment, board.id);
        let lists: Vec<BoardList> = self.execute(self.request(config, Method::GET, &path)?).await?;

        tracing::info!(
            project = %project_id,
            board = board.id,
            "Fetched {} board lists",
            lists.len()
        );
        Ok(lists)
    }
}
