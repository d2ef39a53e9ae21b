//! Issue entity mirroring a GitHub issue.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub repository_id: Uuid,
    #[sea_orm(unique)]
    pub github_id: i64,
    /// Stored as text, like the counters below
    pub number: String,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub body: Option<String>,
    /// `open` or `closed`
    pub state: String,
    pub locked: bool,
    pub author: String,
    pub author_association: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub assignees: JsonValue,
    #[sea_orm(column_type = "JsonBinary")]
    pub labels: JsonValue,
    pub milestone: Option<String>,
    pub comments_count: String,
    pub reactions_count: String,
    pub url: String,
    pub html_url: String,
    pub api_url: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: JsonValue,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id",
        on_delete = "Cascade"
    )]
    Repository,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
