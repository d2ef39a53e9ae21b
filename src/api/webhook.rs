//! GitHub webhook ingestion.
//!
//! Verifies the delivery signature, routes by `x-github-event` and hands work
//! to the event queue. Nothing slow happens inline.

use actix_web::{HttpRequest, HttpResponse, web};
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{DbPool, installations};
use crate::error::{AppResult, ErrorResponse};
use crate::models::events::{IssueEventData, RepositoriesChangedData};
use crate::models::github::WebhookPayload;
use crate::models::installation::SuccessResponse;
use crate::models::{Event, IssueAction};
use crate::services::installation_lifecycle;
use crate::services::webhook_signature::verify_signature;
use crate::services::EventDispatcher;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// GitHub caps webhook deliveries at 25 MB.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Configure webhook routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/github/webhook")
            .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
            .route(web::post().to(receive_webhook)),
    );
}

/// What the router did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Pong,
    Dispatched,
    Skipped,
    Ignored,
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Receive a GitHub webhook delivery.
#[utoipa::path(
    post,
    path = "/api/v1/github/webhook",
    tag = "GitHub",
    request_body(content = String, content_type = "application/json", description = "Raw webhook payload"),
    params(
        ("x-hub-signature-256" = String, Header, description = "sha256=<hex HMAC of the body>"),
        ("x-github-event" = String, Header, description = "Event type")
    ),
    responses(
        (status = 200, description = "Delivery handled or ignored", body = SuccessResponse),
        (status = 400, description = "Missing event header or malformed JSON", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse)
    )
)]
pub async fn receive_webhook(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    dispatcher: web::Data<EventDispatcher>,
) -> HttpResponse {
    let delivery = header_value(&req, DELIVERY_HEADER).unwrap_or("-");

    let Some(signature) = header_value(&req, SIGNATURE_HEADER) else {
        warn!(delivery = %delivery, "Webhook rejected: missing signature");
        return HttpResponse::Unauthorized().json(ErrorResponse::new("Missing signature"));
    };

    let verified = match config.github_app.webhook_secret.as_ref() {
        Some(secret) => verify_signature(&body, Some(signature), secret.expose_secret()),
        None => {
            error!("GITHUB_WEBHOOK_SECRET is not configured, rejecting webhook");
            false
        }
    };
    if !verified {
        warn!(delivery = %delivery, "Webhook rejected: invalid signature");
        return HttpResponse::Unauthorized().json(ErrorResponse::new("Invalid signature"));
    }

    let Some(event) = header_value(&req, EVENT_HEADER) else {
        warn!(delivery = %delivery, "Webhook rejected: missing event header");
        return HttpResponse::BadRequest().json(ErrorResponse::new("Missing event header"));
    };

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(delivery = %delivery, event = %event, error = %e, "Webhook rejected: invalid JSON");
            return HttpResponse::BadRequest().json(ErrorResponse::new("Invalid JSON payload"));
        }
    };

    match route_event(event, &payload, &pool, &dispatcher).await {
        Ok(outcome) => {
            info!(
                delivery = %delivery,
                event = %event,
                action = payload.action.as_deref().unwrap_or("-"),
                outcome = ?outcome,
                "Webhook processed"
            );
            HttpResponse::Ok().json(SuccessResponse::ok())
        }
        Err(e) => {
            error!(delivery = %delivery, event = %event, error = %e, "Webhook processing failed");
            HttpResponse::InternalServerError().json(ErrorResponse::new("Processing failed"))
        }
    }
}

/// Route a verified, parsed delivery by event type.
pub async fn route_event(
    event: &str,
    payload: &WebhookPayload,
    pool: &DbPool,
    dispatcher: &EventDispatcher,
) -> AppResult<WebhookOutcome> {
    let action = payload.action.as_deref().unwrap_or("");

    match event {
        "ping" => Ok(WebhookOutcome::Pong),
        "installation" => handle_installation(action, payload, pool, dispatcher).await,
        "installation_repositories" => {
            handle_installation_repositories(action, payload, pool, dispatcher).await
        }
        "issues" => handle_issues(action, payload, pool, dispatcher).await,
        other => {
            info!(event = %other, action = %action, "Unhandled webhook event");
            Ok(WebhookOutcome::Ignored)
        }
    }
}

async fn handle_installation(
    action: &str,
    payload: &WebhookPayload,
    pool: &DbPool,
    dispatcher: &EventDispatcher,
) -> AppResult<WebhookOutcome> {
    let Some(installation) = payload.installation.as_ref() else {
        warn!(action = %action, "Installation webhook without installation");
        return Ok(WebhookOutcome::Skipped);
    };

    let emitted = match action {
        "created" => {
            installation_lifecycle::on_installation_created(
                pool.connection(),
                dispatcher,
                installation,
            )
            .await?
        }
        "deleted" => {
            installation_lifecycle::on_installation_deleted(
                pool.connection(),
                dispatcher,
                installation.id,
            )
            .await?
        }
        _ => {
            info!(action = %action, installation_id = installation.id, "Ignoring installation action");
            return Ok(WebhookOutcome::Ignored);
        }
    };

    Ok(if emitted {
        WebhookOutcome::Dispatched
    } else {
        WebhookOutcome::Skipped
    })
}

async fn handle_installation_repositories(
    action: &str,
    payload: &WebhookPayload,
    pool: &DbPool,
    dispatcher: &EventDispatcher,
) -> AppResult<WebhookOutcome> {
    if action != "added" && action != "removed" {
        info!(action = %action, "Ignoring installation_repositories action");
        return Ok(WebhookOutcome::Ignored);
    }
    let Some(installation) = payload.installation.as_ref() else {
        warn!(action = %action, "installation_repositories webhook without installation");
        return Ok(WebhookOutcome::Skipped);
    };

    let Some(organization_id) =
        installations::resolve_organization(pool.connection(), installation.id).await?
    else {
        warn!(installation_id = installation.id, "No organization found for installation");
        return Ok(WebhookOutcome::Skipped);
    };

    dispatcher
        .emit(Event::RepositoriesChanged(RepositoriesChangedData {
            action: action.to_string(),
            installation_id: installation.id,
            organization_id,
            repositories_added: payload.repositories_added.clone(),
            repositories_removed: payload.repositories_removed.clone(),
            repository_selection: payload
                .repository_selection
                .clone()
                .or_else(|| installation.repository_selection.clone()),
        }))
        .await?;
    Ok(WebhookOutcome::Dispatched)
}

async fn handle_issues(
    action: &str,
    payload: &WebhookPayload,
    pool: &DbPool,
    dispatcher: &EventDispatcher,
) -> AppResult<WebhookOutcome> {
    let Some(issue_action) = IssueAction::parse(action) else {
        info!(action = %action, "Ignoring issues action");
        return Ok(WebhookOutcome::Ignored);
    };

    let (Some(installation), Some(issue), Some(repository)) = (
        payload.installation.as_ref(),
        payload.issue.as_ref(),
        payload.repository.as_ref(),
    ) else {
        warn!(action = %action, "Issues webhook missing installation, issue or repository");
        return Ok(WebhookOutcome::Skipped);
    };

    let Some(organization_id) =
        installations::resolve_organization(pool.connection(), installation.id).await?
    else {
        warn!(
            installation_id = installation.id,
            repository = %repository.full_name,
            issue_number = issue.number,
            "No organization found for installation, skipping issue event"
        );
        return Ok(WebhookOutcome::Skipped);
    };

    dispatcher
        .emit(Event::issue(
            issue_action,
            IssueEventData {
                installation_id: installation.id,
                organization_id,
                issue: issue.clone(),
                repository: repository.clone(),
            },
        ))
        .await?;
    Ok(WebhookOutcome::Dispatched)
}
