//! Actix-web extractor for the signed-in user.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use std::future::{Ready, ready};
use tracing::debug;
use uuid::Uuid;

use super::SessionKey;
use crate::config::SESSION_COOKIE;
use crate::error::ErrorResponse;

/// Authentication error for extractors. Always rendered as a bare 401.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        debug!(reason = %self.message, "Rejected unauthenticated request");
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse::new("Unauthorized"))
    }
}

/// Extractor that requires a valid session cookie.
///
/// Handlers that redirect instead of failing take `Option<SessionUser>`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequest for SessionUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(key) = req.app_data::<web::Data<SessionKey>>() else {
            return ready(Err(AuthError {
                message: "Internal configuration error".to_string(),
            }));
        };

        let Some(cookie) = req.cookie(SESSION_COOKIE) else {
            return ready(Err(AuthError {
                message: "Missing session cookie".to_string(),
            }));
        };

        let result = key
            .verify(cookie.value())
            .and_then(|claims| {
                Uuid::parse_str(&claims.sub)
                    .map(|user_id| SessionUser {
                        user_id,
                        username: claims.username,
                    })
                    .map_err(|e| format!("Invalid subject: {}", e))
            })
            .map_err(|message| AuthError { message });

        ready(result)
    }
}
