//! Installation directory: maps remote installation ids to organizations and
//! holds each organization's encrypted credentials and metadata.

use chrono::Utc;
use sea_orm::*;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::integration_installation::{self, Column, Entity};
use crate::error::{AppError, AppResult};
use crate::models::InstallationMetadata;

/// Organization linked to `installation_id`, or `None` when the id is unknown.
pub async fn resolve_organization(
    db: &DatabaseConnection,
    installation_id: i64,
) -> AppResult<Option<Uuid>> {
    let row = Entity::find()
        .filter(Column::InstallationId.eq(installation_id))
        .one(db)
        .await?;

    if row.is_none() {
        debug!(installation_id, "No directory row for installation");
    }
    Ok(row.map(|r| r.organization_id))
}

/// Insert or update the organization's row for `provider`.
///
/// Keyed by organization: a reinstall under a new installation id overwrites
/// the previous token, installation id and metadata.
pub async fn upsert_installation(
    db: &DatabaseConnection,
    organization_id: Uuid,
    provider: &str,
    encrypted_token: &str,
    metadata: &InstallationMetadata,
) -> AppResult<()> {
    let now = Utc::now();
    let metadata_json = serde_json::to_value(metadata)?;

    let existing = Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .filter(Column::Provider.eq(provider))
        .one(db)
        .await?;

    if let Some(m) = existing {
        let mut active: integration_installation::ActiveModel = m.into();
        active.installation_id = Set(metadata.installation_id);
        active.access_token = Set(encrypted_token.to_string());
        active.metadata = Set(metadata_json);
        active.updated_at = Set(now);
        active.update(db).await?;

        info!(
            organization_id = %organization_id,
            installation_id = metadata.installation_id,
            "Updated installation"
        );
        return Ok(());
    }

    let model = integration_installation::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        provider: Set(provider.to_string()),
        installation_id: Set(metadata.installation_id),
        access_token: Set(encrypted_token.to_string()),
        refresh_token: Set(None),
        metadata: Set(metadata_json),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Entity::insert(model).exec(db).await?;

    info!(
        organization_id = %organization_id,
        installation_id = metadata.installation_id,
        "Created installation"
    );
    Ok(())
}

pub async fn find_by_organization(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> AppResult<Option<integration_installation::Model>> {
    Ok(Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?)
}

pub async fn find_by_installation_id(
    db: &DatabaseConnection,
    installation_id: i64,
) -> AppResult<Option<integration_installation::Model>> {
    Ok(Entity::find()
        .filter(Column::InstallationId.eq(installation_id))
        .one(db)
        .await?)
}

/// Delete every row of the organization. Returns the number of rows removed.
pub async fn delete_by_organization(db: &DatabaseConnection, organization_id: Uuid) -> AppResult<u64> {
    let result = Entity::delete_many()
        .filter(Column::OrganizationId.eq(organization_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<u64> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}

pub async fn count_by_organization(db: &DatabaseConnection, organization_id: Uuid) -> AppResult<u64> {
    Ok(Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .count(db)
        .await?)
}

/// Decode the metadata blob of a row.
pub fn metadata_of(model: &integration_installation::Model) -> AppResult<InstallationMetadata> {
    serde_json::from_value(model.metadata.clone())
        .map_err(|e| AppError::Internal(format!("Corrupt installation metadata: {e}")))
}
