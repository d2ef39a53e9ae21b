//! Database operations for mirrored issues.

use chrono::{DateTime, Utc};
use sea_orm::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::entity::issue::{self, Column, Entity};
use crate::entity::repository;
use crate::error::AppResult;

/// Mutable fields of an issue row, derived from a provider payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub github_id: i64,
    pub number: String,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub locked: bool,
    pub author: String,
    pub author_association: Option<String>,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub milestone: Option<String>,
    pub comments_count: String,
    pub reactions_count: String,
    pub url: String,
    pub html_url: String,
    pub api_url: String,
    pub metadata: JsonValue,
}

/// Filters for listing an organization's issues.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub state: Option<String>,
    pub repository_id: Option<Uuid>,
}

pub async fn find_by_github_id(
    db: &DatabaseConnection,
    github_id: i64,
) -> AppResult<Option<issue::Model>> {
    Ok(Entity::find()
        .filter(Column::GithubId.eq(github_id))
        .one(db)
        .await?)
}

pub async fn insert(
    db: &DatabaseConnection,
    organization_id: Uuid,
    repository_id: Uuid,
    record: IssueRecord,
) -> AppResult<issue::Model> {
    let now = Utc::now();
    let mut model = issue::ActiveModel {
        id: Set(Uuid::new_v4()),
        github_id: Set(record.github_id),
        created_at: Set(now),
        ..Default::default()
    };
    apply(&mut model, organization_id, repository_id, record, now);
    Ok(model.insert(db).await?)
}

/// Overwrite every mutable field of `existing` and bump `updated_at`.
pub async fn overwrite(
    db: &DatabaseConnection,
    existing: issue::Model,
    organization_id: Uuid,
    repository_id: Uuid,
    record: IssueRecord,
) -> AppResult<issue::Model> {
    let mut model: issue::ActiveModel = existing.into();
    apply(&mut model, organization_id, repository_id, record, Utc::now());
    Ok(model.update(db).await?)
}

fn apply(
    model: &mut issue::ActiveModel,
    organization_id: Uuid,
    repository_id: Uuid,
    record: IssueRecord,
    now: DateTime<Utc>,
) {
    model.organization_id = Set(organization_id);
    model.repository_id = Set(repository_id);
    model.number = Set(record.number);
    model.title = Set(record.title);
    model.body = Set(record.body);
    model.state = Set(record.state);
    model.locked = Set(record.locked);
    model.author = Set(record.author);
    model.author_association = Set(record.author_association);
    model.assignees = Set(serde_json::json!(record.assignees));
    model.labels = Set(serde_json::json!(record.labels));
    model.milestone = Set(record.milestone);
    model.comments_count = Set(record.comments_count);
    model.reactions_count = Set(record.reactions_count);
    model.url = Set(record.url);
    model.html_url = Set(record.html_url);
    model.api_url = Set(record.api_url);
    model.metadata = Set(record.metadata);
    model.updated_at = Set(now);
}

fn organization_scope(organization_id: Uuid, filter: &IssueFilter) -> Select<Entity> {
    let mut query = Entity::find().filter(Column::OrganizationId.eq(organization_id));
    if let Some(state) = filter.state.as_deref() {
        query = query.filter(Column::State.eq(state));
    }
    if let Some(repository_id) = filter.repository_id {
        query = query.filter(Column::RepositoryId.eq(repository_id));
    }
    query
}

/// One page of an organization's issues, newest `updated_at` first, with their repositories.
pub async fn list_by_organization(
    db: &DatabaseConnection,
    organization_id: Uuid,
    filter: &IssueFilter,
    limit: u64,
    offset: u64,
) -> AppResult<Vec<(issue::Model, Option<repository::Model>)>> {
    Ok(organization_scope(organization_id, filter)
        .find_also_related(repository::Entity)
        .order_by_desc(Column::UpdatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?)
}

pub async fn count_by_organization(
    db: &DatabaseConnection,
    organization_id: Uuid,
    filter: &IssueFilter,
) -> AppResult<u64> {
    Ok(organization_scope(organization_id, filter).count(db).await?)
}

/// Issues created at or after `since`.
pub async fn count_created_since(
    db: &DatabaseConnection,
    organization_id: Uuid,
    since: DateTime<Utc>,
) -> AppResult<u64> {
    Ok(Entity::find()
        .filter(Column::OrganizationId.eq(organization_id))
        .filter(Column::CreatedAt.gte(since))
        .count(db)
        .await?)
}
