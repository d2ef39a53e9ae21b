//! Users signed in through GitHub.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::models::user::{GitHubUserInfo, User};

/// Insert the GitHub profile, or refresh it when `github_id` is already known.
///
/// Stamps `last_login_at`; the row id and `created_at` of an existing user are kept.
pub async fn upsert_from_github(db: &DatabaseConnection, profile: &GitHubUserInfo) -> AppResult<User> {
    let now = Utc::now();
    let row = user::ActiveModel {
        id: Set(Uuid::now_v7()),
        github_id: Set(profile.id),
        username: Set(profile.login.clone()),
        display_name: Set(profile.name.clone()),
        avatar_url: Set(profile.avatar_url.clone()),
        email: Set(profile.email.clone()),
        last_login_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user::Entity::insert(row)
        .on_conflict(
            OnConflict::column(user::Column::GithubId)
                .update_columns([
                    user::Column::Username,
                    user::Column::DisplayName,
                    user::Column::AvatarUrl,
                    user::Column::Email,
                    user::Column::LastLoginAt,
                    user::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    user::Entity::find()
        .filter(user::Column::GithubId.eq(profile.id))
        .one(db)
        .await?
        .map(User::from)
        .ok_or_else(|| AppError::Database(format!("user {} missing after upsert", profile.id)))
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<User>> {
    Ok(user::Entity::find_by_id(id).one(db).await?.map(User::from))
}
