//! Invocation endpoint for the hosted event queue.
//!
//! The queue POSTs each event back here; the registered handlers run and any
//! failure is reported as a 500 so the queue retries.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ErrorResponse;
use crate::api::webhook::MAX_PAYLOAD_BYTES;
use crate::models::Event;
use crate::models::installation::SuccessResponse;
use crate::services::EventHandlers;
use crate::services::webhook_signature::hmac_sha256;

pub const INNGEST_SIGNATURE_HEADER: &str = "x-inngest-signature";

/// Oldest accepted signature timestamp, in seconds.
const SIGNATURE_MAX_AGE_SECS: u64 = 5 * 60;

/// Configure invocation routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/inngest")
            .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
            .route(web::post().to(invoke)),
    );
}

#[derive(Debug, Deserialize)]
struct InvocationRequest {
    event: Event,
}

/// Strip the `signkey-<env>-` prefix the queue puts on signing keys.
fn normalize_signing_key(key: &str) -> &str {
    key.strip_prefix("signkey-")
        .and_then(|rest| rest.split_once('-').map(|(_, k)| k))
        .unwrap_or(key)
}

/// Verify `t=<unix>&s=<hex>` as HMAC-SHA256(key, body + t) and check freshness.
pub fn verify_invocation_signature(body: &[u8], header: &str, signing_key: &str, now: i64) -> bool {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split('&') {
        match part.split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("s", v)) => signature = Some(v),
            _ => {}
        }
    }
    let (Some(t), Some(s)) = (timestamp, signature) else {
        return false;
    };
    let Ok(ts) = t.parse::<i64>() else {
        return false;
    };
    if now.abs_diff(ts) > SIGNATURE_MAX_AGE_SECS {
        warn!(timestamp = ts, "Invocation signature expired");
        return false;
    }

    let mut message = body.to_vec();
    message.extend_from_slice(t.as_bytes());
    let expected = hex::encode(hmac_sha256(
        normalize_signing_key(signing_key).as_bytes(),
        &message,
    ));

    expected.len() == s.len() && bool::from(expected.as_bytes().ct_eq(s.as_bytes()))
}

/// Run the handler for one queued event.
#[utoipa::path(
    post,
    path = "/api/v1/inngest",
    tag = "Events",
    request_body(content = String, content_type = "application/json", description = "{\"event\": {\"name\", \"data\"}}"),
    responses(
        (status = 200, description = "Event handled", body = SuccessResponse),
        (status = 400, description = "Unknown or malformed event", body = ErrorResponse),
        (status = 401, description = "Invalid signature", body = ErrorResponse),
        (status = 500, description = "Handler failed", body = ErrorResponse)
    )
)]
pub async fn invoke(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<Config>,
    handlers: web::Data<EventHandlers>,
) -> HttpResponse {
    if let Some(key) = config.event_queue.signing_key.as_ref() {
        let header = req
            .headers()
            .get(INNGEST_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_invocation_signature(&body, header, key.expose_secret(), Utc::now().timestamp())
        {
            warn!("Invocation rejected: invalid signature");
            return HttpResponse::Unauthorized().json(ErrorResponse::new("Invalid signature"));
        }
    }

    let request: InvocationRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Invocation rejected: unknown or malformed event");
            return HttpResponse::BadRequest().json(ErrorResponse::new("Invalid event"));
        }
    };
    if let Err(reason) = request.event.validate() {
        warn!(event = %request.event.name(), reason, "Invocation rejected: invalid event");
        return HttpResponse::BadRequest().json(ErrorResponse::new("Invalid event"));
    }

    let name = request.event.name();
    match handlers.handle(&request.event).await {
        Ok(outcome) => {
            info!(event = %name, outcome = ?outcome, "Invocation handled");
            HttpResponse::Ok().json(SuccessResponse::ok())
        }
        Err(e) => {
            error!(event = %name, error = %e, "Invocation handler failed");
            HttpResponse::InternalServerError().json(ErrorResponse::new("Handler failed"))
        }
    }
}
