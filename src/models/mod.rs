//! Domain and wire models for StarSling.

use utoipa::ToSchema;

pub mod dashboard;
pub mod events;
pub mod github;
pub mod installation;
pub mod user;

// Re-export commonly used types
pub use dashboard::{
    DashboardStats, IssueListResponse, IssueResponse, RepositoryListResponse,
    RepositoryResponse,
};
pub use events::{Event, EventName, IssueAction};
pub use github::{GitHubInstallation, GitHubIssue, GitHubRepository};
pub use installation::{InstallState, InstallationMetadata, IntegrationStatus};

/// Pagination parameters.
#[derive(Debug, Clone, Default, serde::Deserialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl PaginationParams {
    /// Requested page, never below 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(default_page()).max(1)
    }

    /// Calculate the offset for database queries.
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1).saturating_mul(u64::from(self.clamped_limit()))
    }

    /// Clamp limit to maximum allowed value.
    pub fn clamped_limit(&self) -> u32 {
        self.limit.unwrap_or(default_limit()).clamp(1, 100)
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            total_count.div_ceil(limit as u64) as u32
        };

        Pagination {
            page,
            limit,
            total_count,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}
