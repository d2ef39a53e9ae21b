//! Repository entity mirroring a GitHub repository.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    #[sea_orm(unique)]
    pub github_id: i64,
    pub name: String,
    pub full_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub private: bool,
    pub url: String,
    pub clone_url: Option<String>,
    pub default_branch: String,
    pub language: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub topics: JsonValue,
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
    #[sea_orm(has_many = "super::issue::Entity")]
    Issues,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
