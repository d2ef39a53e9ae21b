//! Shared helpers: test database, app factory, session cookies and fixtures.

use std::sync::{Arc, Mutex};

use actix_web::cookie::Cookie;
use actix_web::{App, dev::ServiceResponse, test, web};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;

use starsling_lib::auth::SessionKey;
use starsling_lib::config::{Config, SESSION_COOKIE};
use starsling_lib::db::{DbPool, installations, organizations, users};
use starsling_lib::models::installation::PROVIDER_GITHUB;
use starsling_lib::models::user::GitHubUserInfo;
use starsling_lib::models::{Event, InstallationMetadata};
use starsling_lib::services::event_dispatcher::QueueError;
use starsling_lib::services::webhook_signature::sign_payload;
use starsling_lib::services::{
    EventDispatcher, EventHandlers, EventQueue, GitHubAppClient, TokenCipher,
};

use super::mock_github::{MockGitHub, app_private_key_pem};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const APP_SLUG: &str = "starsling-test";
pub const APP_URL: &str = "http://localhost:3000";

/// Event queue that records every accepted event.
#[derive(Default)]
pub struct RecordingQueue {
    events: Mutex<Vec<Event>>,
    fail: Mutex<bool>,
}

impl RecordingQueue {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Make every following send fail.
    pub fn fail_sends(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl EventQueue for RecordingQueue {
    async fn send(&self, event: &Event) -> Result<(), QueueError> {
        if *self.fail.lock().unwrap() {
            return Err(QueueError::Rejected {
                status: 503,
                message: "queue unavailable".to_string(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

/// Everything a test needs: database, GitHub mock and the recorded events.
pub struct TestContext {
    pub pool: DbPool,
    pub github: MockGitHub,
    pub config: Config,
    pub queue: Arc<RecordingQueue>,
    pub dispatcher: EventDispatcher,
    pub cipher: TokenCipher,
    pub session_key: SessionKey,
}

/// Fresh in-memory SQLite database with migrations applied.
pub async fn create_test_pool() -> DbPool {
    let pool = DbPool::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

impl TestContext {
    pub async fn new() -> Self {
        let pool = create_test_pool().await;
        let github = MockGitHub::start().await;

        let mut config = Config::development();
        config.app_url = APP_URL.to_string();
        config.github_app.app_id = Some(4242);
        config.github_app.private_key = Some(SecretString::from(app_private_key_pem()));
        config.github_app.slug = Some(APP_SLUG.to_string());
        config.github_app.webhook_secret = Some(SecretString::from(WEBHOOK_SECRET));
        config.github_app.api_url = github.uri();

        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = EventDispatcher::new(queue.clone());
        let cipher = TokenCipher::new(config.encryption_key.clone());
        let session_key = SessionKey::new(config.session.secret.clone(), config.session.ttl_secs);

        TestContext {
            pool,
            github,
            config,
            queue,
            dispatcher,
            cipher,
            session_key,
        }
    }

    pub fn github_client(&self) -> GitHubAppClient {
        GitHubAppClient::new(&self.config.github_app).expect("Failed to build GitHub client")
    }

    /// Build the app with every route group under `/api/v1`.
    pub async fn app(
        &self,
    ) -> impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    > {
        test::init_service(
            App::new()
                .app_data(web::Data::new(self.config.clone()))
                .app_data(web::Data::new(self.pool.clone()))
                .app_data(web::Data::new(EventHandlers::new(self.pool.clone())))
                .app_data(web::Data::new(self.dispatcher.clone()))
                .app_data(web::Data::new(self.github_client()))
                .app_data(web::Data::new(self.cipher.clone()))
                .app_data(web::Data::new(self.session_key.clone()))
                .service(web::scope("/api/v1").configure(starsling_lib::api::configure_routes)),
        )
        .await
    }

    /// Create a user with a default organization. Returns `(user_id, organization_id)`.
    pub async fn create_user(&self, github_id: i64, login: &str) -> (Uuid, Uuid) {
        let profile = GitHubUserInfo {
            id: github_id,
            login: login.to_string(),
            name: None,
            avatar_url: None,
            email: None,
        };
        let user = users::upsert_from_github(self.pool.connection(), &profile)
            .await
            .expect("Failed to create user");
        let org = organizations::get_or_create_default(self.pool.connection(), user.id)
            .await
            .expect("Failed to create organization");
        (user.id, org.id)
    }

    /// Session cookie for `user_id`.
    pub fn session_cookie(&self, user_id: Uuid, username: &str) -> Cookie<'static> {
        let token = self
            .session_key
            .issue(user_id, username)
            .expect("Failed to issue session token");
        Cookie::new(SESSION_COOKIE, token)
    }

    /// Link `installation_id` to `organization_id` directly in the directory.
    pub async fn link_installation(&self, organization_id: Uuid, installation_id: i64, login: &str) {
        let metadata = InstallationMetadata {
            installation_id,
            account_id: 9000 + installation_id,
            account_type: "Organization".to_string(),
            account_login: login.to_string(),
            permissions: Default::default(),
            events: vec!["issues".to_string()],
        };
        let encrypted = self.cipher.encrypt("ghs_seeded").expect("Failed to encrypt");
        installations::upsert_installation(
            self.pool.connection(),
            organization_id,
            PROVIDER_GITHUB,
            &encrypted,
            &metadata,
        )
        .await
        .expect("Failed to link installation");
    }
}

/// Signed webhook request.
pub fn webhook_request(event: &str, body: &Value) -> test::TestRequest {
    let bytes = serde_json::to_vec(body).unwrap();
    test::TestRequest::post()
        .uri("/api/v1/github/webhook")
        .insert_header(("x-github-event", event))
        .insert_header(("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958"))
        .insert_header(("x-hub-signature-256", sign_payload(&bytes, WEBHOOK_SECRET)))
        .insert_header(("content-type", "application/json"))
        .set_payload(bytes)
}

pub fn issue_json(github_id: i64, number: i64, state: &str) -> Value {
    json!({
        "id": github_id,
        "number": number,
        "title": format!("Issue {}", number),
        "body": "Steps to reproduce",
        "state": state,
        "locked": false,
        "user": { "login": "octocat" },
        "author_association": "OWNER",
        "assignees": [{ "login": "hubot" }],
        "labels": [{ "name": "bug" }],
        "milestone": null,
        "comments": 2,
        "reactions": { "total_count": 5 },
        "url": format!("https://api.github.com/repos/acme/widgets/issues/{}", number),
        "html_url": format!("https://github.com/acme/widgets/issues/{}", number),
        "created_at": "2026-10-01T12:00:00Z",
        "updated_at": "2026-10-02T12:00:00Z"
    })
}

pub fn repository_json(github_id: i64, name: &str) -> Value {
    json!({
        "id": github_id,
        "name": name,
        "full_name": format!("acme/{}", name),
        "description": "Widgets",
        "private": false,
        "url": format!("https://api.github.com/repos/acme/{}", name),
        "clone_url": format!("https://github.com/acme/{}.git", name),
        "default_branch": "main",
        "language": "Rust",
        "topics": ["widgets"]
    })
}

pub fn issues_payload(action: &str, installation_id: i64, issue: Value, repository: Value) -> Value {
    json!({
        "action": action,
        "installation": { "id": installation_id },
        "issue": issue,
        "repository": repository
    })
}
