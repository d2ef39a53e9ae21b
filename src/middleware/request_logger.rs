//! Request logging middleware.
//!
//! Logs method, path, status and duration for every request. The `state` and
//! `code` query values carry OAuth and installation secrets and are redacted.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::Instant;
use tracing::{info, warn};

/// Query parameters whose values never reach the logs.
const REDACTED_PARAMS: &[&str] = &["state", "code"];

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query = redact_query(req.query_string());
        let github_event = req
            .headers()
            .get("x-github-event")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let elapsed = start.elapsed();
            let status = res.status();

            if status.is_success() || status.is_redirection() {
                info!(
                    target: "api",
                    method = %method,
                    path = %path,
                    query = %query,
                    github_event = %github_event,
                    status = status.as_u16(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Request completed"
                );
            } else if status.is_client_error() {
                warn!(
                    target: "api",
                    method = %method,
                    path = %path,
                    query = %query,
                    github_event = %github_event,
                    status = status.as_u16(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Client error"
                );
            } else {
                warn!(
                    target: "api",
                    method = %method,
                    path = %path,
                    query = %query,
                    github_event = %github_event,
                    status = status.as_u16(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Server error"
                );
            }

            Ok(res)
        })
    }
}

/// Replace the values of sensitive query parameters with `[REDACTED]`.
fn redact_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if REDACTED_PARAMS.contains(&key) => format!("{}=[REDACTED]", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
