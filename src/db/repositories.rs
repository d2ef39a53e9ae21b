//! Database operations for mirrored repositories.

use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::repository::{self, Column, Entity};
use crate::error::AppResult;
use crate::models::github::GitHubRepository;

pub async fn find_by_github_id(
    db: &DatabaseConnection,
    github_id: i64,
) -> AppResult<Option<repository::Model>> {
    Ok(Entity::find()
        .filter(Column::GithubId.eq(github_id))
        .one(db)
        .await?)
}

/// Insert a repository row derived from a webhook payload.
pub async fn insert_from_github(
    db: &DatabaseConnection,
    organization_id: Uuid,
    repo: &GitHubRepository,
) -> AppResult<repository::Model> {
    let now = Utc::now();
    let model = repository::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        github_id: Set(repo.id),
        name: Set(repo.name.clone()),
        full_name: Set(repo.full_name.clone()),
        description: Set(repo.description.clone()),
        private: Set(repo.private),
        url: Set(repo.url.clone()),
        clone_url: Set(repo.clone_url.clone()),
        default_branch: Set(repo
            .default_branch
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "main".to_string())),
        language: Set(repo.language.clone()),
        topics: Set(serde_json::json!(repo.topics.clone().unwrap_or_default())),
        metadata: Set(serde_json::json!({
            "size": repo.size,
            "stargazersCount": repo.stargazers_count,
            "watchersCount": repo.watchers_count,
            "forksCount": repo.forks_count,
            "openIssuesCount": repo.open_issues_count,
            "hasIssues": repo.has_issues,
            "hasProjects": repo.has_projects,
            "hasWiki": repo.has_wiki,
            "hasPages": repo.has_pages,
            "archived": repo.archived,
            "disabled": repo.disabled,
        })),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Ok(model.insert(db).await?)
}

/// Repositories of an organization ordered by name.
pub async fn list_by_organization(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> AppResult<Vec<repository::Model>> {
    Ok(Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .order_by_asc(Column::Name)
        .all(db)
        .await?)
}

pub async fn count_by_organization(db: &DatabaseConnection, organization_id: Uuid) -> AppResult<u64> {
    Ok(Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .count(db)
        .await?)
}
