//! Read models for the dashboard: issues, repositories and summary statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Pagination;
use super::user::OrganizationSummary;

/// Query parameters for `GET /issues`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `open`, `closed` or `all` (default)
    pub state: Option<String>,
    pub repository_id: Option<Uuid>,
}

/// Repository fields embedded in an issue row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueRepositorySummary {
    pub id: Uuid,
    pub name: String,
    pub full_name: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub id: Uuid,
    pub github_id: i64,
    pub number: String,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub locked: bool,
    pub author: String,
    pub author_association: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub assignees: JsonValue,
    #[schema(value_type = Vec<String>)]
    pub labels: JsonValue,
    pub milestone: Option<String>,
    pub comments_count: String,
    pub reactions_count: String,
    pub url: String,
    pub html_url: String,
    #[schema(value_type = Object)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub repository: IssueRepositorySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueListResponse {
    pub issues: Vec<IssueResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryResponse {
    pub id: Uuid,
    pub github_id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub url: String,
    pub default_branch: String,
    pub language: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub topics: JsonValue,
    #[schema(value_type = Object)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepositoryListResponse {
    pub repositories: Vec<RepositoryResponse>,
    pub organization: OrganizationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total: u64,
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    pub total: u64,
    pub open: u64,
    pub closed: u64,
    /// Created in the last 7 days
    pub recent: u64,
    /// Closed share of all issues, as a rounded percentage
    pub resolution_rate: u32,
    pub has_data: bool,
}

impl IssueStats {
    pub fn new(open: u64, closed: u64, recent: u64) -> Self {
        let total = open + closed;
        let resolution_rate = if total > 0 {
            ((closed as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };
        IssueStats {
            total,
            open,
            closed,
            recent,
            resolution_rate,
            has_data: total > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IntegrationStats {
    pub connected: bool,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub repositories: RepositoryStats,
    pub issues: IssueStats,
    pub integrations: IntegrationStats,
    pub organization: OrganizationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStatsResponse {
    pub stats: DashboardStats,
}
