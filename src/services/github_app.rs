//! GitHub App REST client.
//!
//! Authenticates as the App with a short-lived RS256 JWT and calls the
//! installation endpoints used by the integration flows.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GitHubAppSettings;
use crate::models::github::{GitHubInstallation, InstallationToken};

/// HTTP connect timeout for GitHub API calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP total timeout for GitHub API calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "starsling";
const API_VERSION: &str = "2022-11-28";

/// Errors from the GitHub App API.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// The API answered 404 for the requested resource.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from GitHub: {0}")]
    InvalidResponse(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("GitHub App is not configured: {0}")]
    NotConfigured(&'static str),
}

#[derive(Debug, Serialize, Deserialize)]
struct AppClaims {
    iat: u64,
    exp: u64,
    iss: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Client for the App-level endpoints of the GitHub REST API.
#[derive(Clone)]
pub struct GitHubAppClient {
    http: reqwest::Client,
    api_url: String,
    app_id: Option<u64>,
    private_key: Option<SecretString>,
}

impl GitHubAppClient {
    pub fn new(settings: &GitHubAppSettings) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            app_id: settings.app_id,
            private_key: settings.private_key.clone(),
        })
    }

    /// Sign a JWT identifying the App. Valid from one minute ago for nine minutes.
    pub fn app_jwt(&self) -> Result<String, GitHubError> {
        let app_id = self.app_id.ok_or(GitHubError::NotConfigured("GITHUB_APP_ID"))?;
        let private_key = self
            .private_key
            .as_ref()
            .ok_or(GitHubError::NotConfigured("GITHUB_APP_PRIVATE_KEY"))?;

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = AppClaims {
            iat: now.saturating_sub(60),
            exp: now + 9 * 60,
            iss: app_id.to_string(),
        };

        let key = EncodingKey::from_rsa_pem(private_key.expose_secret().as_bytes())
            .map_err(|e| GitHubError::Jwt(format!("Invalid RSA private key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| GitHubError::Jwt(format!("Failed to encode JWT: {e}")))
    }

    /// `GET /app/installations/{id}`
    pub async fn get_installation(
        &self,
        installation_id: i64,
    ) -> Result<GitHubInstallation, GitHubError> {
        let url = format!("{}/app/installations/{}", self.api_url, installation_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.app_jwt()?)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        debug!(installation_id, status = %response.status(), "Fetched installation");
        parse_response(response, &format!("installation {installation_id}")).await
    }

    /// `GET /app/installations`
    pub async fn list_installations(&self) -> Result<Vec<GitHubInstallation>, GitHubError> {
        let url = format!("{}/app/installations", self.api_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.app_jwt()?)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        parse_response(response, "app installations").await
    }

    /// `POST /app/installations/{id}/access_tokens`
    pub async fn create_installation_token(
        &self,
        installation_id: i64,
    ) -> Result<InstallationToken, GitHubError> {
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, installation_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.app_jwt()?)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        parse_response(response, &format!("installation {installation_id}")).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, GitHubError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(GitHubError::NotFound(resource.to_string()));
    }

    if !status.is_success() {
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        warn!(status = status.as_u16(), resource, message = %message, "GitHub API request failed");
        return Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| GitHubError::InvalidResponse(e.to_string()))
}
