// crates/kanlab-services/src/types.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A project reference: numeric id or `namespace/path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectId {
    Id(u64),
    Path(String),
}

impl ProjectId {
    /// Form used as a single URL path segment. Paths are percent-encoded,
    /// so `group/app` becomes `group%2Fapp`.
    pub fn to_path_segment(&self) -> String {
        match self {
            ProjectId::Id(id) => id.to_string(),
            ProjectId::Path(path) => urlencoding::encode(path).into_owned(),
        }
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectId::Id(id) => write!(f, "{}", id),
            ProjectId::Path(path) => f.write_str(path),
        }
    }
}

impl From<u64> for ProjectId {
    fn from(id: u64) -> Self {
        ProjectId::Id(id)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        match value.parse::<u64>() {
            Ok(id) => ProjectId::Id(id),
            Err(_) => ProjectId::Path(value.to_string()),
        }
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        ProjectId::from(value.as_str())
    }
}

impl From<&ProjectId> for ProjectId {
    fn from(value: &ProjectId) -> Self {
        value.clone()
    }
}

impl FromStr for ProjectId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ProjectId::from(s))
    }
}

/// GitLab project. Fields beyond `id` are kept as returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_with_namespace: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Label object returned when `with_labels_details=true`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An issue label in either of the shapes GitLab sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueLabel {
    Name(String),
    Detailed(LabelDetail),
}

impl IssueLabel {
    pub fn name(&self) -> &str {
        match self {
            IssueLabel::Name(name) => name,
            IssueLabel::Detailed(detail) => &detail.name,
        }
    }
}

/// GitLab issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    /// Project-scoped issue number
    pub iid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(IssueLabel::name).collect()
    }
}

/// Issue board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One column of a board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardList {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the label update. GitLab takes labels as one comma-separated string.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateIssueLabelsRequest {
    pub labels: String,
}

impl UpdateIssueLabelsRequest {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}
