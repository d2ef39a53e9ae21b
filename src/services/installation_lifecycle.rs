//! Connection lifecycle of an organization's GitHub App installation.
//!
//! Disconnected (no directory row) becomes Connected on a successful callback
//! or sync. Connected becomes Disconnected on an explicit disconnect (event
//! emitted), on an uninstall webhook (event emitted) or when verification finds
//! the remote installation gone (no event).

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::installations;
use crate::error::{AppError, AppResult};
use crate::models::events::{InstallationCreatedData, InstallationDeletedData};
use crate::models::github::GitHubInstallation;
use crate::models::installation::{PROVIDER_GITHUB, SyncedInstallation};
use crate::models::{Event, InstallState, InstallationMetadata, IntegrationStatus};
use crate::services::event_dispatcher::EventDispatcher;
use crate::services::github_app::{GitHubAppClient, GitHubError};
use crate::services::token_cipher::TokenCipher;

/// How long a state parameter stays valid.
pub const STATE_MAX_AGE_MS: i64 = 5 * 60 * 1000;
/// Tolerated clock skew for state timestamps in the future.
pub const STATE_MAX_FUTURE_SKEW_MS: i64 = 60 * 1000;

const INVALID_STATE: &str = "Invalid state parameter";
const VERIFY_FAILED: &str = "Failed to verify integration";

/// Collaborators shared by the lifecycle operations.
pub struct LifecycleContext<'a> {
    pub db: &'a DatabaseConnection,
    pub github: &'a GitHubAppClient,
    pub cipher: &'a TokenCipher,
    pub dispatcher: &'a EventDispatcher,
}

/// Build the state parameter for an installation redirect.
pub fn new_state(organization_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> InstallState {
    InstallState {
        organization_id,
        user_id,
        timestamp: now.timestamp_millis(),
    }
}

/// Decode and check a state parameter against the signed-in user.
///
/// Every failure yields the same generic validation error.
pub fn validate_state(raw: &str, session_user_id: Uuid, now: DateTime<Utc>) -> AppResult<InstallState> {
    let Some(state) = InstallState::decode(raw) else {
        warn!("Install state could not be decoded");
        return Err(AppError::Validation(INVALID_STATE.to_string()));
    };

    let Some(age_ms) = now.timestamp_millis().checked_sub(state.timestamp) else {
        warn!(timestamp = state.timestamp, "Install state timestamp out of range");
        return Err(AppError::Validation(INVALID_STATE.to_string()));
    };
    if age_ms > STATE_MAX_AGE_MS {
        warn!(age_ms, "Install state expired");
        return Err(AppError::Validation(INVALID_STATE.to_string()));
    }
    if age_ms < -STATE_MAX_FUTURE_SKEW_MS {
        warn!(age_ms, "Install state timestamp is in the future");
        return Err(AppError::Validation(INVALID_STATE.to_string()));
    }

    if state.user_id != session_user_id {
        warn!(
            state_user_id = %state.user_id,
            session_user_id = %session_user_id,
            "Install state user mismatch"
        );
        return Err(AppError::Validation(INVALID_STATE.to_string()));
    }

    Ok(state)
}

/// Link `installation_id` to the organization after the installation redirect.
///
/// A failed event emission is logged; the stored row stays.
pub async fn complete_installation(
    ctx: &LifecycleContext<'_>,
    organization_id: Uuid,
    installation_id: i64,
) -> AppResult<InstallationMetadata> {
    let installation = ctx.github.get_installation(installation_id).await?;
    let metadata = persist_installation(ctx, organization_id, &installation).await?;

    let event = Event::InstallationCreated(InstallationCreatedData {
        installation_id: metadata.installation_id,
        account_id: metadata.account_id,
        account_type: metadata.account_type.clone(),
        account_login: metadata.account_login.clone(),
        organization_id,
    });
    if let Err(e) = ctx.dispatcher.emit(event).await {
        error!(
            organization_id = %organization_id,
            installation_id,
            error = %e,
            "Failed to emit installation.created"
        );
    }

    info!(
        organization_id = %organization_id,
        installation_id,
        account_login = %metadata.account_login,
        "GitHub App installation connected"
    );
    Ok(metadata)
}

/// Remove the organization's installation and announce it.
pub async fn disconnect(ctx: &LifecycleContext<'_>, organization_id: Uuid) -> AppResult<()> {
    let row = installations::find_by_organization(ctx.db, organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Integration".to_string()))?;

    installations::delete_by_organization(ctx.db, organization_id).await?;
    info!(
        organization_id = %organization_id,
        installation_id = row.installation_id,
        "GitHub integration disconnected"
    );

    let event = Event::InstallationDeleted(InstallationDeletedData {
        installation_id: row.installation_id,
        organization_id,
    });
    if let Err(e) = ctx.dispatcher.emit(event).await {
        error!(
            organization_id = %organization_id,
            installation_id = row.installation_id,
            error = %e,
            "Failed to emit installation.deleted"
        );
    }

    Ok(())
}

/// Check the stored installation against GitHub.
///
/// A 404 from GitHub removes the row without emitting an event.
pub async fn verify_status(
    ctx: &LifecycleContext<'_>,
    organization_id: Uuid,
) -> AppResult<IntegrationStatus> {
    let Some(row) = installations::find_by_organization(ctx.db, organization_id).await? else {
        return Ok(IntegrationStatus::disconnected());
    };

    match ctx.github.get_installation(row.installation_id).await {
        Ok(installation) => Ok(IntegrationStatus::connected(&InstallationMetadata::from(
            &installation,
        ))),
        Err(GitHubError::NotFound(_)) => {
            installations::delete_by_id(ctx.db, row.id).await?;
            warn!(
                organization_id = %organization_id,
                installation_id = row.installation_id,
                "Installation no longer exists on GitHub, removed stale record"
            );
            Ok(IntegrationStatus::disconnected())
        }
        Err(e) => {
            error!(
                organization_id = %organization_id,
                installation_id = row.installation_id,
                error = %e,
                "Failed to verify installation"
            );
            Ok(IntegrationStatus::failed(VERIFY_FAILED))
        }
    }
}

/// Link the first installation visible to the App when the organization has none.
pub async fn sync_first_installation(
    ctx: &LifecycleContext<'_>,
    organization_id: Uuid,
) -> AppResult<SyncedInstallation> {
    if installations::find_by_organization(ctx.db, organization_id)
        .await?
        .is_some()
    {
        warn!(organization_id = %organization_id, "Integration already exists for organization");
        return Err(AppError::Validation("Integration already exists".to_string()));
    }

    let listed = ctx.github.list_installations().await?;
    let Some(installation) = listed.into_iter().next() else {
        info!(organization_id = %organization_id, "No GitHub App installations found");
        return Err(AppError::NotFound("GitHub App installations".to_string()));
    };

    let metadata = persist_installation(ctx, organization_id, &installation).await?;
    info!(
        organization_id = %organization_id,
        installation_id = metadata.installation_id,
        "Synced GitHub App installation"
    );

    Ok(SyncedInstallation {
        id: metadata.installation_id,
        account_login: metadata.account_login,
        account_type: metadata.account_type,
    })
}

/// `installation.created` webhook: announce only installations already linked.
pub async fn on_installation_created(
    db: &DatabaseConnection,
    dispatcher: &EventDispatcher,
    installation: &GitHubInstallation,
) -> AppResult<bool> {
    let Some(organization_id) = installations::resolve_organization(db, installation.id).await?
    else {
        info!(
            installation_id = installation.id,
            "Installation created webhook for unlinked installation"
        );
        return Ok(false);
    };

    let metadata = InstallationMetadata::from(installation);
    dispatcher
        .emit(Event::InstallationCreated(InstallationCreatedData {
            installation_id: metadata.installation_id,
            account_id: metadata.account_id,
            account_type: metadata.account_type,
            account_login: metadata.account_login,
            organization_id,
        }))
        .await?;
    Ok(true)
}

/// `installation.deleted` webhook: drop the linked row and announce it.
pub async fn on_installation_deleted(
    db: &DatabaseConnection,
    dispatcher: &EventDispatcher,
    installation_id: i64,
) -> AppResult<bool> {
    let Some(row) = installations::find_by_installation_id(db, installation_id).await? else {
        info!(installation_id, "Installation deleted webhook for unlinked installation");
        return Ok(false);
    };

    installations::delete_by_id(db, row.id).await?;
    info!(
        organization_id = %row.organization_id,
        installation_id,
        "Removed installation after uninstall"
    );

    dispatcher
        .emit(Event::InstallationDeleted(InstallationDeletedData {
            installation_id,
            organization_id: row.organization_id,
        }))
        .await?;
    Ok(true)
}

async fn persist_installation(
    ctx: &LifecycleContext<'_>,
    organization_id: Uuid,
    installation: &GitHubInstallation,
) -> AppResult<InstallationMetadata> {
    let token = ctx.github.create_installation_token(installation.id).await?;
    let encrypted = ctx.cipher.encrypt(&token.token)?;
    let metadata = InstallationMetadata::from(installation);

    installations::upsert_installation(ctx.db, organization_id, PROVIDER_GITHUB, &encrypted, &metadata)
        .await?;
    Ok(metadata)
}
