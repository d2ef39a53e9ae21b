//! Installation directory metadata, install state and integration status.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::github::GitHubInstallation;

/// Provider tag stored on every directory row.
pub const PROVIDER_GITHUB: &str = "github";

/// Account type recorded when GitHub omits the account.
const DEFAULT_ACCOUNT_TYPE: &str = "Organization";

/// Structured metadata kept alongside an installation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallationMetadata {
    pub installation_id: i64,
    pub account_id: i64,
    pub account_type: String,
    pub account_login: String,
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
    #[serde(default)]
    pub events: Vec<String>,
}

impl From<&GitHubInstallation> for InstallationMetadata {
    fn from(inst: &GitHubInstallation) -> Self {
        let (account_id, account_type, account_login) = match &inst.account {
            Some(a) => (a.id, a.account_type.clone(), a.login.clone()),
            None => (0, DEFAULT_ACCOUNT_TYPE.to_string(), String::new()),
        };
        InstallationMetadata {
            installation_id: inst.id,
            account_id,
            account_type,
            account_login,
            permissions: inst.permissions.clone(),
            events: inst.events.clone(),
        }
    }
}

/// State parameter carried through the GitHub installation redirect.
///
/// Encoded as base64 of `{"organizationId","userId","timestamp"}` with the
/// timestamp in milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallState {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: i64,
}

impl InstallState {
    pub fn encode(&self) -> String {
        // Serializing a struct of plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        BASE64.encode(json)
    }

    /// Decode a raw state value. `None` when it is not base64 JSON of the expected shape.
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = BASE64.decode(raw.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Connection status reported to the integrations page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntegrationStatus {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        IntegrationStatus {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn connected(metadata: &InstallationMetadata) -> Self {
        IntegrationStatus {
            connected: true,
            installation_id: Some(metadata.installation_id),
            account_login: Some(metadata.account_login.clone()),
            account_type: Some(metadata.account_type.clone()),
            permissions: Some(metadata.permissions.clone()),
            events: Some(metadata.events.clone()),
            error: None,
        }
    }
}

/// Public identity of an installation linked by the sync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncedInstallation {
    pub id: i64,
    pub account_login: String,
    pub account_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    pub success: bool,
    pub installation: SyncedInstallation,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        SuccessResponse { success: true }
    }
}
