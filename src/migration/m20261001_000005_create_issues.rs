//! Create issues table.

use sea_orm_migration::prelude::*;

use super::m20261001_000002_create_organizations::Organizations;
use super::m20261001_000004_create_repositories::Repositories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issues::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Issues::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Issues::RepositoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(Issues::GithubId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Issues::Number).string().not_null())
                    .col(ColumnDef::new(Issues::Title).text().not_null())
                    .col(ColumnDef::new(Issues::Body).text())
                    .col(ColumnDef::new(Issues::State).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Issues::Locked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Issues::Author).string().not_null())
                    .col(ColumnDef::new(Issues::AuthorAssociation).string())
                    .col(ColumnDef::new(Issues::Assignees).json_binary().not_null())
                    .col(ColumnDef::new(Issues::Labels).json_binary().not_null())
                    .col(ColumnDef::new(Issues::Milestone).string())
                    .col(
                        ColumnDef::new(Issues::CommentsCount)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(Issues::ReactionsCount)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(ColumnDef::new(Issues::Url).string().not_null())
                    .col(ColumnDef::new(Issues::HtmlUrl).string().not_null())
                    .col(ColumnDef::new(Issues::ApiUrl).string().not_null())
                    .col(ColumnDef::new(Issues::Metadata).json_binary().not_null())
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Issues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Issues::Table, Issues::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Issues::Table, Issues::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_organization_updated")
                    .table(Issues::Table)
                    .col(Issues::OrganizationId)
                    .col(Issues::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_repository_id")
                    .table(Issues::Table)
                    .col(Issues::RepositoryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Issues {
    Table,
    Id,
    OrganizationId,
    RepositoryId,
    GithubId,
    Number,
    Title,
    Body,
    State,
    Locked,
    Author,
    AuthorAssociation,
    Assignees,
    Labels,
    Milestone,
    CommentsCount,
    ReactionsCount,
    Url,
    HtmlUrl,
    ApiUrl,
    Metadata,
    CreatedAt,
    UpdatedAt,
}
