//! Database operations for organizations and memberships.

use chrono::Utc;
use sea_orm::*;
use tracing::info;
use uuid::Uuid;

use crate::entity::{organization, organization_member};
use crate::error::{AppError, AppResult};
use crate::models::user::OrganizationSummary;

pub const ROLE_OWNER: &str = "owner";

/// Name given to lazily created organizations.
const DEFAULT_ORGANIZATION_NAME: &str = "Personal Organization";

/// Slug of a default organization: `personal-` plus 12 hex characters of its random id.
pub fn default_slug(organization_id: Uuid) -> String {
    let id = organization_id.simple().to_string();
    format!("personal-{}", &id[..12])
}

/// Return the first organization the user owns, creating a personal one if none exists.
pub async fn get_or_create_default(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<organization::Model> {
    if let Some(existing) = organization::Entity::find()
        .filter(organization::Column::OwnerId.eq(user_id))
        .order_by_asc(organization::Column::CreatedAt)
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    let id = Uuid::new_v4();
    let model = organization::ActiveModel {
        id: Set(id),
        name: Set(DEFAULT_ORGANIZATION_NAME.to_string()),
        slug: Set(default_slug(id)),
        description: Set(None),
        owner_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    organization::Entity::insert(model).exec(db).await?;

    let member = organization_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(id),
        user_id: Set(user_id),
        role: Set(ROLE_OWNER.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    organization_member::Entity::insert(member).exec(db).await?;

    info!(organization_id = %id, user_id = %user_id, "Created default organization");

    organization::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Database("Failed to fetch newly created organization".to_string()))
}

/// Role of `user_id` in `organization_id`, if any. Owners count even without a membership row.
pub async fn user_role(
    db: &DatabaseConnection,
    user_id: Uuid,
    organization_id: Uuid,
) -> AppResult<Option<String>> {
    let member = organization_member::Entity::find()
        .filter(organization_member::Column::OrganizationId.eq(organization_id))
        .filter(organization_member::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    if let Some(m) = member {
        return Ok(Some(m.role));
    }

    let owned = organization::Entity::find_by_id(organization_id)
        .filter(organization::Column::OwnerId.eq(user_id))
        .one(db)
        .await?;

    Ok(owned.map(|_| ROLE_OWNER.to_string()))
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> AppResult<Option<organization::Model>> {
    Ok(organization::Entity::find_by_id(organization_id).one(db).await?)
}

impl From<&organization::Model> for OrganizationSummary {
    fn from(m: &organization::Model) -> Self {
        OrganizationSummary {
            id: m.id,
            name: m.name.clone(),
            slug: m.slug.clone(),
        }
    }
}
