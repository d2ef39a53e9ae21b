//! Dashboard read API over the caller's organization.

use actix_web::{HttpResponse, get, web};
use chrono::{Duration, Utc};

use crate::auth::SessionUser;
use crate::db::issues::IssueFilter;
use crate::db::{DbPool, installations, issues, organizations, repositories};
use crate::entity::{issue, repository};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::dashboard::{
    DashboardStatsResponse, IntegrationStats, IssueQuery, IssueRepositorySummary, IssueStats,
    RepositoryStats,
};
use crate::models::user::OrganizationSummary;
use crate::models::{
    DashboardStats, IssueListResponse, IssueResponse, Pagination, PaginationParams,
    RepositoryListResponse, RepositoryResponse,
};

/// Window for the "recent issues" counter.
const RECENT_DAYS: i64 = 7;

/// Configure dashboard routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_issues)
        .service(list_repositories)
        .service(dashboard_stats);
}

fn issue_response(
    model: issue::Model,
    repo: repository::Model,
) -> IssueResponse {
    IssueResponse {
        id: model.id,
        github_id: model.github_id,
        number: model.number,
        title: model.title,
        body: model.body,
        state: model.state,
        locked: model.locked,
        author: model.author,
        author_association: model.author_association,
        assignees: model.assignees,
        labels: model.labels,
        milestone: model.milestone,
        comments_count: model.comments_count,
        reactions_count: model.reactions_count,
        url: model.url,
        html_url: model.html_url,
        metadata: model.metadata,
        created_at: model.created_at,
        updated_at: model.updated_at,
        repository: IssueRepositorySummary {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            language: repo.language,
        },
    }
}

impl From<repository::Model> for RepositoryResponse {
    fn from(m: repository::Model) -> Self {
        RepositoryResponse {
            id: m.id,
            github_id: m.github_id,
            name: m.name,
            full_name: m.full_name,
            description: m.description,
            private: m.private,
            url: m.url,
            default_branch: m.default_branch,
            language: m.language,
            topics: m.topics,
            metadata: m.metadata,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// `open` and `closed` filter; anything else lists every state.
fn state_filter(state: Option<&str>) -> Option<String> {
    match state {
        Some("open") => Some("open".to_string()),
        Some("closed") => Some("closed".to_string()),
        _ => None,
    }
}

/// List the organization's issues.
///
/// GET /issues?page=1&limit=20&state=open&repositoryId=...
#[utoipa::path(
    get,
    path = "/api/v1/issues",
    tag = "Dashboard",
    params(
        ("page" = Option<u32>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u32>, Query, description = "Items per page (default: 20, max: 100)"),
        ("state" = Option<String>, Query, description = "open, closed or all"),
        ("repositoryId" = Option<String>, Query, description = "Repository UUID")
    ),
    responses(
        (status = 200, description = "Page of issues", body = IssueListResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[get("/issues")]
pub async fn list_issues(
    user: SessionUser,
    query: web::Query<IssueQuery>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let conn = pool.connection();
    let organization = organizations::get_or_create_default(conn, user.user_id).await?;

    let paging = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let filter = IssueFilter {
        state: state_filter(query.state.as_deref()),
        repository_id: query.repository_id,
    };

    let total = issues::count_by_organization(conn, organization.id, &filter).await?;
    let rows = issues::list_by_organization(
        conn,
        organization.id,
        &filter,
        paging.clamped_limit() as u64,
        paging.offset(),
    )
    .await?;

    let issues = rows
        .into_iter()
        .map(|(model, repo)| {
            let repo = repo.ok_or_else(|| {
                AppError::Database(format!("Issue {} has no repository", model.id))
            })?;
            Ok(issue_response(model, repo))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(IssueListResponse {
        issues,
        pagination: Pagination::new(paging.page(), paging.clamped_limit(), total),
    }))
}

/// List the organization's repositories ordered by name.
#[utoipa::path(
    get,
    path = "/api/v1/repositories",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Repositories", body = RepositoryListResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[get("/repositories")]
pub async fn list_repositories(
    user: SessionUser,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let conn = pool.connection();
    let organization = organizations::get_or_create_default(conn, user.user_id).await?;
    let repos = repositories::list_by_organization(conn, organization.id).await?;

    Ok(HttpResponse::Ok().json(RepositoryListResponse {
        repositories: repos.into_iter().map(RepositoryResponse::from).collect(),
        organization: OrganizationSummary::from(&organization),
    }))
}

/// Summary counters for the dashboard.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStatsResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[get("/dashboard/stats")]
pub async fn dashboard_stats(
    user: SessionUser,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let conn = pool.connection();
    let organization = organizations::get_or_create_default(conn, user.user_id).await?;
    let org_id = organization.id;

    let repository_total = repositories::count_by_organization(conn, org_id).await?;
    let open = issues::count_by_organization(
        conn,
        org_id,
        &IssueFilter {
            state: Some("open".to_string()),
            ..Default::default()
        },
    )
    .await?;
    let closed = issues::count_by_organization(
        conn,
        org_id,
        &IssueFilter {
            state: Some("closed".to_string()),
            ..Default::default()
        },
    )
    .await?;
    let recent =
        issues::count_created_since(conn, org_id, Utc::now() - Duration::days(RECENT_DAYS)).await?;
    let integration_count = installations::count_by_organization(conn, org_id).await?;

    Ok(HttpResponse::Ok().json(DashboardStatsResponse {
        stats: DashboardStats {
            repositories: RepositoryStats {
                total: repository_total,
                has_data: repository_total > 0,
            },
            issues: IssueStats::new(open, closed, recent),
            integrations: IntegrationStats {
                connected: integration_count > 0,
                count: integration_count,
            },
            organization: OrganizationSummary::from(&organization),
        },
    }))
}
