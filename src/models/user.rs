//! User and session models for GitHub sign-in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User stored in database.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub github_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for User {
    fn from(m: crate::entity::user::Model) -> Self {
        Self {
            id: m.id,
            github_id: m.github_id,
            username: m.username,
            display_name: m.display_name,
            avatar_url: m.avatar_url,
            email: m.email,
            last_login_at: m.last_login_at,
            created_at: m.created_at,
        }
    }
}

/// User info response (returned by /auth/me).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub organization: Option<OrganizationSummary>,
}

impl UserResponse {
    pub fn new(u: User, organization: Option<OrganizationSummary>) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            avatar_url: u.avatar_url,
            organization,
        }
    }
}

/// Organization identity embedded in several responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// GitHub user info from API.
#[derive(Debug, Deserialize)]
pub struct GitHubUserInfo {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub username: String,
}
