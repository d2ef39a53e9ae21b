//! API endpoint modules.

pub mod dashboard;
pub mod health;
pub mod inngest;
pub mod integrations;
pub mod openapi;
pub mod webhook;

use actix_web::web;

pub use dashboard::configure_routes as configure_dashboard_routes;
pub use health::configure_health_routes;
pub use inngest::configure_routes as configure_inngest_routes;
pub use integrations::configure_routes as configure_integration_routes;
pub use openapi::ApiDoc;
pub use webhook::configure_routes as configure_webhook_routes;

/// Every route group served under `/api/v1`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_webhook_routes)
        .configure(configure_integration_routes)
        .configure(configure_dashboard_routes)
        .configure(configure_inngest_routes)
        .configure(crate::services::configure_auth_routes);
}
