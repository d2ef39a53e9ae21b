//! GitHub App integration endpoints: install redirect, installation callback,
//! disconnect, sync and status.
//!
//! The callback only ever redirects to the UI with a coarse `success` or
//! `error` flag.

use actix_web::{HttpResponse, ResponseError, get, post, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::config::Config;
use crate::db::{DbPool, organizations};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::IntegrationStatus;
use crate::models::installation::{SuccessResponse, SyncResponse};
use crate::services::installation_lifecycle::{self, LifecycleContext};
use crate::services::{EventDispatcher, GitHubAppClient, TokenCipher};

const GITHUB_APPS_URL: &str = "https://github.com/apps";

/// Configure integration routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(install)
        .service(callback)
        .service(disconnect)
        .service(sync)
        .service(status);
}

/// Query for `GET /github/install`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InstallQuery {
    /// Organization to connect; the caller's default organization when absent
    pub organization_id: Option<Uuid>,
}

/// Query GitHub sends back after an installation.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub installation_id: Option<String>,
    pub setup_action: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Shared collaborators of the lifecycle handlers, as injected app data.
struct Lifecycle {
    pool: web::Data<DbPool>,
    github: web::Data<GitHubAppClient>,
    cipher: web::Data<TokenCipher>,
    dispatcher: web::Data<EventDispatcher>,
}

impl Lifecycle {
    fn context(&self) -> LifecycleContext<'_> {
        LifecycleContext {
            db: self.pool.connection(),
            github: self.github.get_ref(),
            cipher: self.cipher.get_ref(),
            dispatcher: self.dispatcher.get_ref(),
        }
    }
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

/// Redirect to the GitHub App installation page.
#[utoipa::path(
    get,
    path = "/api/v1/github/install",
    tag = "GitHub",
    params(InstallQuery),
    responses(
        (status = 302, description = "Redirect to GitHub"),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    )
)]
#[get("/github/install")]
pub async fn install(
    user: SessionUser,
    query: web::Query<InstallQuery>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let slug = config
        .github_app
        .slug
        .as_deref()
        .ok_or_else(|| AppError::Internal("GITHUB_APP_SLUG is not configured".to_string()))?;

    let organization_id = match query.organization_id {
        Some(id) => {
            organizations::user_role(pool.connection(), user.user_id, id)
                .await?
                .ok_or_else(|| AppError::NotFound("Organization".to_string()))?;
            id
        }
        None => {
            organizations::get_or_create_default(pool.connection(), user.user_id)
                .await?
                .id
        }
    };

    let state = installation_lifecycle::new_state(organization_id, user.user_id, Utc::now());
    info!(
        organization_id = %organization_id,
        user_id = %user.user_id,
        "Redirecting to GitHub App installation"
    );

    Ok(redirect(format!(
        "{}/{}/installations/new?state={}",
        GITHUB_APPS_URL,
        urlencoding::encode(slug),
        urlencoding::encode(&state.encode()),
    )))
}

/// Complete an installation started by `install`.
#[utoipa::path(
    get,
    path = "/api/v1/github/callback",
    tag = "GitHub",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Redirect to the integrations page with a success or error flag")
    )
)]
#[get("/github/callback")]
pub async fn callback(
    user: Option<SessionUser>,
    query: web::Query<CallbackQuery>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    github: web::Data<GitHubAppClient>,
    cipher: web::Data<TokenCipher>,
    dispatcher: web::Data<EventDispatcher>,
) -> HttpResponse {
    let Some(user) = user else {
        return redirect(config.app_redirect("/login"));
    };

    if let Some(reason) = query.error.as_deref() {
        warn!(user_id = %user.user_id, reason = %reason, "GitHub installation was not completed");
        return redirect(config.app_redirect("/integrations?error=access_denied"));
    }

    let invalid_request = || redirect(config.app_redirect("/integrations?error=invalid_request"));

    let installation_id = query
        .installation_id
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|id| *id > 0);
    let (Some(installation_id), Some(raw_state)) = (installation_id, query.state.as_deref()) else {
        warn!(user_id = %user.user_id, "Installation callback missing installation_id or state");
        return invalid_request();
    };

    let Ok(state) = installation_lifecycle::validate_state(raw_state, user.user_id, Utc::now())
    else {
        return invalid_request();
    };

    let lifecycle = Lifecycle {
        pool,
        github,
        cipher,
        dispatcher,
    };

    match organizations::user_role(lifecycle.pool.connection(), user.user_id, state.organization_id)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(
                user_id = %user.user_id,
                organization_id = %state.organization_id,
                "Install state names an organization the user does not belong to"
            );
            return invalid_request();
        }
        Err(e) => {
            error!(error = %e, "Failed to check organization membership");
            return redirect(config.app_redirect("/integrations?error=callback_failed"));
        }
    }

    match installation_lifecycle::complete_installation(
        &lifecycle.context(),
        state.organization_id,
        installation_id,
    )
    .await
    {
        Ok(_) => redirect(config.app_redirect("/integrations?success=connected")),
        Err(e) => {
            error!(
                organization_id = %state.organization_id,
                installation_id,
                setup_action = query.setup_action.as_deref().unwrap_or("-"),
                error = %e,
                "Installation callback failed"
            );
            redirect(config.app_redirect("/integrations?error=callback_failed"))
        }
    }
}

/// Disconnect the caller's organization from its GitHub App installation.
#[utoipa::path(
    post,
    path = "/api/v1/github/disconnect",
    tag = "GitHub",
    responses(
        (status = 200, description = "Disconnected", body = SuccessResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Integration not found", body = ErrorResponse),
        (status = 500, description = "Failed to disconnect integration", body = ErrorResponse)
    )
)]
#[post("/github/disconnect")]
pub async fn disconnect(
    user: SessionUser,
    pool: web::Data<DbPool>,
    github: web::Data<GitHubAppClient>,
    cipher: web::Data<TokenCipher>,
    dispatcher: web::Data<EventDispatcher>,
) -> HttpResponse {
    let lifecycle = Lifecycle {
        pool,
        github,
        cipher,
        dispatcher,
    };

    let result = async {
        let organization =
            organizations::get_or_create_default(lifecycle.pool.connection(), user.user_id).await?;
        installation_lifecycle::disconnect(&lifecycle.context(), organization.id).await
    }
    .await;

    match result {
        Ok(()) => HttpResponse::Ok().json(SuccessResponse::ok()),
        Err(e @ AppError::NotFound(_)) => e.error_response(),
        Err(e) => {
            error!(user_id = %user.user_id, error = %e, "Failed to disconnect integration");
            HttpResponse::InternalServerError()
                .json(ErrorResponse::new("Failed to disconnect integration"))
        }
    }
}

/// Link the first installation visible to the App.
#[utoipa::path(
    post,
    path = "/api/v1/github/sync",
    tag = "GitHub",
    responses(
        (status = 200, description = "Installation linked", body = SyncResponse),
        (status = 400, description = "Integration already exists", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "No installations found", body = ErrorResponse),
        (status = 500, description = "Failed to sync installation", body = ErrorResponse)
    )
)]
#[post("/github/sync")]
pub async fn sync(
    user: SessionUser,
    pool: web::Data<DbPool>,
    github: web::Data<GitHubAppClient>,
    cipher: web::Data<TokenCipher>,
    dispatcher: web::Data<EventDispatcher>,
) -> HttpResponse {
    let lifecycle = Lifecycle {
        pool,
        github,
        cipher,
        dispatcher,
    };

    let result = async {
        let organization =
            organizations::get_or_create_default(lifecycle.pool.connection(), user.user_id).await?;
        installation_lifecycle::sync_first_installation(&lifecycle.context(), organization.id).await
    }
    .await;

    match result {
        Ok(installation) => HttpResponse::Ok().json(SyncResponse {
            success: true,
            installation,
        }),
        Err(e @ (AppError::Validation(_) | AppError::NotFound(_))) => e.error_response(),
        Err(e) => {
            error!(user_id = %user.user_id, error = %e, "Failed to sync installation");
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to sync installation"))
        }
    }
}

/// Connection status of the caller's organization, verified against GitHub.
#[utoipa::path(
    get,
    path = "/api/v1/github/status",
    tag = "GitHub",
    responses(
        (status = 200, description = "Integration status", body = IntegrationStatus),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[get("/github/status")]
pub async fn status(
    user: SessionUser,
    pool: web::Data<DbPool>,
    github: web::Data<GitHubAppClient>,
    cipher: web::Data<TokenCipher>,
    dispatcher: web::Data<EventDispatcher>,
) -> AppResult<HttpResponse> {
    let lifecycle = Lifecycle {
        pool,
        github,
        cipher,
        dispatcher,
    };
    let organization =
        organizations::get_or_create_default(lifecycle.pool.connection(), user.user_id).await?;
    let status = installation_lifecycle::verify_status(&lifecycle.context(), organization.id).await?;
    Ok(HttpResponse::Ok().json(status))
}
