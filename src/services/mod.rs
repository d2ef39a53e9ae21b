//! Business logic services.

pub mod event_dispatcher;
pub mod event_handlers;
pub mod event_worker;
pub mod github_app;
pub mod github_oauth;
pub mod installation_lifecycle;
pub mod issue_sync;
pub mod token_cipher;
pub mod webhook_signature;

pub use event_dispatcher::{EventDispatcher, EventQueue, InMemoryQueue, InngestQueue};
pub use event_handlers::EventHandlers;
pub use event_worker::{RetryPolicy, start_event_worker};
pub use github_app::GitHubAppClient;
pub use github_oauth::configure_routes as configure_auth_routes;
pub use token_cipher::TokenCipher;
