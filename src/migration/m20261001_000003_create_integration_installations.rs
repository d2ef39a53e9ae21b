//! Create integration_installations table.
//!
//! The remote installation id lives in its own indexed column so webhook
//! lookups never filter inside the metadata blob.

use sea_orm_migration::prelude::*;

use super::m20261001_000002_create_organizations::Organizations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IntegrationInstallations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntegrationInstallations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IntegrationInstallations::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationInstallations::Provider)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationInstallations::InstallationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationInstallations::AccessToken)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IntegrationInstallations::RefreshToken).text())
                    .col(
                        ColumnDef::new(IntegrationInstallations::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationInstallations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationInstallations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                IntegrationInstallations::Table,
                                IntegrationInstallations::OrganizationId,
                            )
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_integration_installations_installation_id")
                    .table(IntegrationInstallations::Table)
                    .col(IntegrationInstallations::InstallationId)
                    .to_owned(),
            )
            .await?;

        // One installation per organization and provider
        manager
            .create_index(
                Index::create()
                    .name("idx_integration_installations_org_provider")
                    .table(IntegrationInstallations::Table)
                    .col(IntegrationInstallations::OrganizationId)
                    .col(IntegrationInstallations::Provider)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(IntegrationInstallations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub enum IntegrationInstallations {
    Table,
    Id,
    OrganizationId,
    Provider,
    InstallationId,
    AccessToken,
    RefreshToken,
    Metadata,
    CreatedAt,
    UpdatedAt,
}
