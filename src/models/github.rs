//! GitHub payload types as delivered by webhooks and the REST API.
//!
//! Optional fields mirror what GitHub may omit; derivation defaults are applied
//! by the issue synchronizer, not here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Minimal user reference (issue author, assignee).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubUserRef {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubMilestone {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubReactions {
    #[serde(default)]
    pub total_count: Option<i64>,
}

/// Present on issues that are really pull requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubPullRequestRef {
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub diff_url: Option<String>,
    pub patch_url: Option<String>,
}

/// Issue object from an `issues` webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub id: i64,
    pub number: i64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub user: Option<GitHubUserRef>,
    #[serde(default)]
    pub author_association: Option<String>,
    #[serde(default)]
    pub assignees: Option<Vec<GitHubUserRef>>,
    #[serde(default)]
    pub labels: Option<Vec<GitHubLabel>>,
    #[serde(default)]
    pub milestone: Option<GitHubMilestone>,
    #[serde(default)]
    pub comments: Option<i64>,
    #[serde(default)]
    pub reactions: Option<GitHubReactions>,
    pub url: String,
    pub html_url: String,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub pull_request: Option<GitHubPullRequestRef>,
}

/// Repository object from an `issues` webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub stargazers_count: Option<i64>,
    #[serde(default)]
    pub watchers_count: Option<i64>,
    #[serde(default)]
    pub forks_count: Option<i64>,
    #[serde(default)]
    pub open_issues_count: Option<i64>,
    #[serde(default)]
    pub has_issues: Option<bool>,
    #[serde(default)]
    pub has_projects: Option<bool>,
    #[serde(default)]
    pub has_wiki: Option<bool>,
    #[serde(default)]
    pub has_pages: Option<bool>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

/// Repository entry in `installation_repositories` payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
}

/// Account an App is installed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubAccount {
    pub id: i64,
    pub login: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Installation as returned by `GET /app/installations/{id}` and in webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubInstallation {
    pub id: i64,
    #[serde(default)]
    pub account: Option<GitHubAccount>,
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub repository_selection: Option<String>,
}

/// Response of `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Union of the webhook fields this service routes on.
///
/// Every field is optional so one type covers all event kinds; handlers check
/// what their event requires.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub installation: Option<GitHubInstallation>,
    #[serde(default)]
    pub issue: Option<GitHubIssue>,
    #[serde(default)]
    pub repository: Option<GitHubRepository>,
    #[serde(default)]
    pub repositories_added: Vec<RepositoryRef>,
    #[serde(default)]
    pub repositories_removed: Vec<RepositoryRef>,
    #[serde(default)]
    pub repository_selection: Option<String>,
}
