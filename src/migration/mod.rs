//! SeaORM database migrations.
//!
//! Written with the schema builder so they run on PostgreSQL and on the SQLite
//! databases used in tests.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_organizations;
mod m20261001_000003_create_integration_installations;
mod m20261001_000004_create_repositories;
mod m20261001_000005_create_issues;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_organizations::Migration),
            Box::new(m20261001_000003_create_integration_installations::Migration),
            Box::new(m20261001_000004_create_repositories::Migration),
            Box::new(m20261001_000005_create_issues::Migration),
        ]
    }
}
