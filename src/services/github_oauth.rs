//! GitHub OAuth routes for web UI sign-in.
//!
//! A successful sign-in upserts the user, makes sure they have a default
//! organization and sets the `starsling_session` HttpOnly cookie.
//!
//! Endpoints:
//! 1. GET /auth/github: redirect to GitHub (with CSRF `state`)
//! 2. GET /auth/github/callback: verify state, exchange code, set session
//! 3. GET /auth/me: current user from the session cookie
//! 4. POST /auth/logout: clear the session cookie

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::SessionKey;
use crate::config::{Config, SESSION_COOKIE};
use crate::db::{DbPool, organizations, users};
use crate::error::{AppError, AppResult};
use crate::models::user::{GitHubUserInfo, OrganizationSummary, UserResponse};

/// OAuth CSRF state cookie. Holds the random `state` sent to GitHub.
const OAUTH_STATE_COOKIE: &str = "starsling_oauth_state";
const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Configure OAuth routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(github_login)
        .service(github_callback)
        .service(get_current_user)
        .service(logout);
}

fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .user_agent("starsling")
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

fn generate_random_hex() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

fn auth_failed() -> AppError {
    AppError::Unauthorized("GitHub authentication failed".to_string())
}

fn cookie<'c>(name: &'c str, value: String, is_production: bool) -> Cookie<'c> {
    let mut c = Cookie::new(name, value);
    c.set_path("/");
    c.set_http_only(true);
    c.set_same_site(SameSite::Lax);
    c.set_secure(is_production);
    c
}

fn cleared_cookie(name: &str, is_production: bool) -> Cookie<'_> {
    let mut c = cookie(name, String::new(), is_production);
    c.set_max_age(CookieDuration::ZERO);
    c
}

/// Redirect to the GitHub authorization page.
///
/// GET /api/v1/auth/github
#[get("/auth/github")]
pub async fn github_login(config: web::Data<Config>) -> AppResult<HttpResponse> {
    let client_id = config.github_oauth.client_id.as_ref().ok_or_else(|| {
        AppError::Validation("GitHub OAuth is not configured".to_string())
    })?;

    let state = generate_random_hex();
    let authorize_url = format!(
        "{}?client_id={}&state={}&scope={}",
        GITHUB_AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(&state),
        urlencoding::encode("read:user user:email"),
    );

    Ok(HttpResponse::Found()
        .cookie(cookie(
            OAUTH_STATE_COOKIE,
            state,
            config.environment.is_production(),
        ))
        .append_header(("Location", authorize_url))
        .finish())
}

/// Handle the GitHub OAuth callback.
///
/// GET /api/v1/auth/github/callback?code=...&state=...
#[get("/auth/github/callback")]
pub async fn github_callback(
    req: HttpRequest,
    query: web::Query<CallbackQuery>,
    config: web::Data<Config>,
    session_key: web::Data<SessionKey>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let oauth = &config.github_oauth;
    let (Some(client_id), Some(client_secret)) = (&oauth.client_id, &oauth.client_secret) else {
        return Err(AppError::Validation(
            "GitHub OAuth is not configured".to_string(),
        ));
    };

    let expected_state = req
        .cookie(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| {
            warn!("OAuth callback: missing state cookie");
            AppError::Unauthorized("OAuth state verification failed".to_string())
        })?;

    let provided_state = query.state.as_deref().unwrap_or("");
    if provided_state.is_empty() || provided_state != expected_state {
        warn!("OAuth callback: state mismatch");
        return Err(AppError::Unauthorized(
            "OAuth state verification failed".to_string(),
        ));
    }

    let http_client = build_http_client()?;
    let gh_access_token = exchange_code(&http_client, client_id, client_secret, &query.code).await?;
    let user_info = fetch_user(&http_client, &config.github_app.api_url, &gh_access_token).await?;

    let user = users::upsert_from_github(pool.connection(), &user_info).await?;
    let organization = organizations::get_or_create_default(pool.connection(), user.id).await?;

    info!(
        user_id = %user.id,
        username = %user.username,
        organization_id = %organization.id,
        "GitHub sign-in"
    );

    let is_prod = config.environment.is_production();
    let token = session_key.issue(user.id, &user.username)?;
    let mut session_cookie = cookie(SESSION_COOKIE, token, is_prod);
    session_cookie.set_max_age(CookieDuration::seconds(session_key.ttl_secs() as i64));

    Ok(HttpResponse::Found()
        .cookie(session_cookie)
        .cookie(cleared_cookie(OAUTH_STATE_COOKIE, is_prod))
        .append_header(("Location", config.app_redirect("/")))
        .finish())
}

/// Current user, or `{"user": null}` when signed out.
///
/// GET /api/v1/auth/me
#[get("/auth/me")]
pub async fn get_current_user(
    req: HttpRequest,
    session_key: web::Data<SessionKey>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let signed_out = || HttpResponse::Ok().json(serde_json::json!({ "user": null }));

    let Some(cookie) = req.cookie(SESSION_COOKIE) else {
        return Ok(signed_out());
    };
    let Ok(claims) = session_key.verify(cookie.value()) else {
        return Ok(signed_out());
    };
    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return Ok(signed_out());
    };

    match users::find_by_id(pool.connection(), user_id).await? {
        Some(user) => {
            let organization =
                organizations::get_or_create_default(pool.connection(), user.id).await?;
            let response = UserResponse::new(user, Some(OrganizationSummary::from(&organization)));
            Ok(HttpResponse::Ok().json(serde_json::json!({ "user": response })))
        }
        None => Ok(signed_out()),
    }
}

/// Clear the session cookie.
///
/// POST /api/v1/auth/logout
#[post("/auth/logout")]
pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    let is_prod = config.environment.is_production();
    HttpResponse::Ok()
        .cookie(cleared_cookie(SESSION_COOKIE, is_prod))
        .json(serde_json::json!({ "message": "Logged out" }))
}

async fn exchange_code(
    http_client: &reqwest::Client,
    client_id: &str,
    client_secret: &SecretString,
    code: &str,
) -> AppResult<SecretString> {
    let token_response: TokenResponse = http_client
        .post(GITHUB_TOKEN_URL)
        .header("Accept", "application/json")
        .json(&serde_json::json!({
            "client_id": client_id,
            "client_secret": client_secret.expose_secret(),
            "code": code,
        }))
        .send()
        .await
        .map_err(|e| {
            warn!("OAuth: failed to exchange code: {}", e);
            auth_failed()
        })?
        .json()
        .await
        .map_err(|e| {
            warn!("OAuth: failed to parse token response: {}", e);
            auth_failed()
        })?;

    if let Some(ref err) = token_response.error {
        warn!("OAuth: GitHub returned error: {}", err);
        return Err(auth_failed());
    }

    token_response.access_token.map(SecretString::from).ok_or_else(|| {
        warn!("OAuth: no access_token in response");
        auth_failed()
    })
}

async fn fetch_user(
    http_client: &reqwest::Client,
    api_url: &str,
    access_token: &SecretString,
) -> AppResult<GitHubUserInfo> {
    http_client
        .get(format!("{}/user", api_url.trim_end_matches('/')))
        .header(
            "Authorization",
            format!("Bearer {}", access_token.expose_secret()),
        )
        .header("Accept", "application/vnd.github+json")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            warn!("OAuth: failed to fetch user info: {}", e);
            auth_failed()
        })?
        .json()
        .await
        .map_err(|e| {
            warn!("OAuth: failed to parse user info: {}", e);
            auth_failed()
        })
}

#[derive(serde::Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: Option<String>,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}
