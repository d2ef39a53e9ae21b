//! GitHub REST API mock for integration tests.
//!
//! Serves the App installation endpoints from a wiremock server and provides
//! an RSA key for signing App JWTs.

use std::sync::OnceLock;

use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::LineEnding;
use serde_json::{Value, json};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static APP_PRIVATE_KEY: OnceLock<String> = OnceLock::new();

/// PEM of a 2048-bit RSA key, generated once per test binary.
pub fn app_private_key_pem() -> String {
    APP_PRIVATE_KEY
        .get_or_init(|| {
            use rsa::rand_core::OsRng;
            let key = RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA key");
            key.to_pkcs1_pem(LineEnding::LF)
                .expect("failed to encode private key")
                .to_string()
        })
        .clone()
}

/// Installation JSON as GitHub returns it.
pub fn installation_json(installation_id: i64, login: &str) -> Value {
    json!({
        "id": installation_id,
        "account": { "id": 9000 + installation_id, "login": login, "type": "Organization" },
        "permissions": { "issues": "read", "metadata": "read" },
        "events": ["issues", "installation_repositories"],
        "repository_selection": "selected"
    })
}

/// Wrapper around a wiremock server playing the GitHub API.
pub struct MockGitHub {
    pub server: MockServer,
}

impl MockGitHub {
    pub async fn start() -> Self {
        MockGitHub {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// `GET /app/installations/{id}` returns the installation.
    pub async fn installation(&self, installation_id: i64, login: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/app/installations/{}", installation_id)))
            .and(header_exists("authorization"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(installation_json(installation_id, login)),
            )
            .mount(&self.server)
            .await;
    }

    /// `GET /app/installations/{id}` answers with `status`.
    pub async fn installation_status(&self, installation_id: i64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/app/installations/{}", installation_id)))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "message": "Not Found" })),
            )
            .mount(&self.server)
            .await;
    }

    /// `POST /app/installations/{id}/access_tokens` mints a token.
    pub async fn access_token(&self, installation_id: i64, token: &str) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/app/installations/{}/access_tokens",
                installation_id
            )))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": token,
                "expires_at": "2030-01-01T00:00:00Z"
            })))
            .mount(&self.server)
            .await;
    }

    /// `GET /app/installations` lists the given installations.
    pub async fn installations(&self, installations: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(installations)))
            .mount(&self.server)
            .await;
    }

    /// Number of requests GitHub received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}
