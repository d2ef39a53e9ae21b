//! Liveness and readiness probes.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::error::ErrorResponse;
use crate::services::EventDispatcher;

const SERVICE_NAME: &str = "starsling";

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    status: &'static str,
    database: &'static str,
    event_queue: &'static str,
}

/// Process is up. Touches nothing external.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is running", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Database answers and an event queue is wired in.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept webhooks", body = ReadyResponse),
        (status = 503, description = "Database unreachable", body = ErrorResponse)
    )
)]
#[get("/ready")]
pub async fn ready(pool: web::Data<DbPool>, dispatcher: web::Data<EventDispatcher>) -> HttpResponse {
    if let Err(e) = pool.ping().await {
        warn!(error = %e, "Readiness probe failed");
        return HttpResponse::ServiceUnavailable().json(ErrorResponse::new("Database unavailable"));
    }

    HttpResponse::Ok().json(ReadyResponse {
        status: "ready",
        database: "connected",
        event_queue: dispatcher.backend(),
    })
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
