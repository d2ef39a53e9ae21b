//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "StarSling Server",
        version = "0.1.0",
        description = "GitHub App webhooks, installation lifecycle and the issue dashboard API"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // GitHub endpoints
        api::webhook::receive_webhook,
        api::integrations::install,
        api::integrations::callback,
        api::integrations::disconnect,
        api::integrations::sync,
        api::integrations::status,
        // Dashboard endpoints
        api::dashboard::list_issues,
        api::dashboard::list_repositories,
        api::dashboard::dashboard_stats,
        // Event queue
        api::inngest::invoke,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // GitHub
            models::installation::SuccessResponse,
            models::installation::SyncResponse,
            models::installation::SyncedInstallation,
            models::IntegrationStatus,
            models::InstallationMetadata,
            // Dashboard
            models::user::OrganizationSummary,
            models::user::UserResponse,
            models::dashboard::IssueRepositorySummary,
            models::IssueResponse,
            models::IssueListResponse,
            models::RepositoryResponse,
            models::RepositoryListResponse,
            models::dashboard::RepositoryStats,
            models::dashboard::IssueStats,
            models::dashboard::IntegrationStats,
            models::DashboardStats,
            models::dashboard::DashboardStatsResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "GitHub", description = "Webhook ingestion and GitHub App integration"),
        (name = "Dashboard", description = "Mirrored repositories and issues"),
        (name = "Events", description = "Event queue invocation")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the session cookie security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Cookie(
                        utoipa::openapi::security::ApiKeyValue::new(crate::config::SESSION_COOKIE),
                    ),
                ),
            );
        }
    }
}
