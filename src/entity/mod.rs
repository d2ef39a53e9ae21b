//! SeaORM entity definitions.

pub mod integration_installation;
pub mod issue;
pub mod organization;
pub mod organization_member;
pub mod repository;
pub mod user;
