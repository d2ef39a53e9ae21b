//! Integration endpoints: install redirect, callback, disconnect, status and sync.

use actix_web::test;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use starsling_lib::db::installations;
use starsling_lib::models::{EventName, InstallState};
use starsling_lib::services::installation_lifecycle::new_state;

use super::mock_github::installation_json;
use super::test_helpers::*;

fn location(resp: &actix_web::dev::ServiceResponse) -> String {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn callback_uri(installation_id: &str, state: &str) -> String {
    format!(
        "/api/v1/github/callback?installation_id={}&setup_action=install&state={}",
        installation_id,
        urlencoding::encode(state)
    )
}

#[actix_rt::test]
async fn test_install_redirects_to_github_with_state() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/install")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    let loc = location(&resp);
    let prefix = format!("https://github.com/apps/{}/installations/new?state=", APP_SLUG);
    assert!(loc.starts_with(&prefix), "unexpected location {}", loc);

    let raw = urlencoding::decode(&loc[prefix.len()..]).unwrap().into_owned();
    let state = InstallState::decode(&raw).expect("state decodes");
    assert_eq!(state.organization_id, org_id);
    assert_eq!(state.user_id, user_id);
}

#[actix_rt::test]
async fn test_install_for_foreign_organization_not_found() {
    let ctx = TestContext::new().await;
    let (user_id, _) = ctx.create_user(1, "octocat").await;
    let (_, other_org) = ctx.create_user(2, "hubot").await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/github/install?organizationId={}", other_org))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_install_requires_session() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/install")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[actix_rt::test]
async fn test_callback_without_session_redirects_to_login() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/callback?installation_id=55&state=abc")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), format!("{}/login", APP_URL));
}

#[actix_rt::test]
async fn test_callback_error_redirects_access_denied() {
    let ctx = TestContext::new().await;
    let (user_id, _) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/callback?error=access_denied")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?error=access_denied", APP_URL)
    );
}

#[actix_rt::test]
async fn test_callback_missing_installation_id_is_invalid() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let state = new_state(org_id, user_id, Utc::now()).encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("not-a-number", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?error=invalid_request", APP_URL)
    );
    assert_eq!(ctx.github.request_count().await, 0);
}

#[actix_rt::test]
async fn test_callback_expired_state_is_invalid() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let issued = Utc::now() - Duration::minutes(5) - Duration::seconds(1);
    let state = new_state(org_id, user_id, issued).encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("55", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?error=invalid_request", APP_URL)
    );
    assert!(
        installations::find_by_organization(ctx.pool.connection(), org_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[actix_rt::test]
async fn test_callback_out_of_range_state_timestamp_is_invalid() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let state = InstallState {
        organization_id: org_id,
        user_id,
        timestamp: i64::MIN,
    }
    .encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("55", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?error=invalid_request", APP_URL)
    );
    assert_eq!(ctx.github.request_count().await, 0);
}

#[actix_rt::test]
async fn test_callback_state_of_other_user_is_invalid() {
    let ctx = TestContext::new().await;
    let (user_id, _) = ctx.create_user(1, "octocat").await;
    let (other_user, other_org) = ctx.create_user(2, "hubot").await;
    let app = ctx.app().await;

    let state = new_state(other_org, other_user, Utc::now()).encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("55", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?error=invalid_request", APP_URL)
    );
    assert!(ctx.queue.events().is_empty());
}

#[actix_rt::test]
async fn test_callback_connects_installation() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.github.installation(55, "acme").await;
    ctx.github.access_token(55, "ghs_minted").await;
    let app = ctx.app().await;

    let state = new_state(org_id, user_id, Utc::now()).encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("55", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?success=connected", APP_URL)
    );

    let row = installations::find_by_organization(ctx.pool.connection(), org_id)
        .await
        .unwrap()
        .expect("installation stored");
    assert_eq!(row.installation_id, 55);
    assert_ne!(row.access_token, "ghs_minted");
    assert_eq!(ctx.cipher.decrypt(&row.access_token).unwrap(), "ghs_minted");
    assert_eq!(
        installations::metadata_of(&row).unwrap().account_login,
        "acme"
    );

    let events = ctx.queue.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), EventName::InstallationCreated);
    assert_eq!(events[0].organization_id(), org_id);
}

#[actix_rt::test]
async fn test_callback_survives_event_failure() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.github.installation(55, "acme").await;
    ctx.github.access_token(55, "ghs_minted").await;
    ctx.queue.fail_sends();
    let app = ctx.app().await;

    let state = new_state(org_id, user_id, Utc::now()).encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("55", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?success=connected", APP_URL)
    );
    assert!(
        installations::find_by_organization(ctx.pool.connection(), org_id)
            .await
            .unwrap()
            .is_some()
    );
}

#[actix_rt::test]
async fn test_callback_github_failure_redirects_callback_failed() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.github.installation_status(55, 500).await;
    let app = ctx.app().await;

    let state = new_state(org_id, user_id, Utc::now()).encode();
    let req = test::TestRequest::get()
        .uri(&callback_uri("55", &state))
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        location(&resp),
        format!("{}/integrations?error=callback_failed", APP_URL)
    );
    assert!(ctx.queue.events().is_empty());
}

#[actix_rt::test]
async fn test_disconnect_without_integration_is_not_found() {
    let ctx = TestContext::new().await;
    let (user_id, _) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/github/disconnect")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Integration not found" }));
    assert!(ctx.queue.events().is_empty());
}

#[actix_rt::test]
async fn test_disconnect_removes_row_and_emits() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    let app = ctx.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/github/disconnect")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "success": true }));
    assert!(
        installations::find_by_organization(ctx.pool.connection(), org_id)
            .await
            .unwrap()
            .is_none()
    );
    let events = ctx.queue.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), EventName::InstallationDeleted);
}

#[actix_rt::test]
async fn test_disconnect_deletes_even_when_event_fails() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    ctx.queue.fail_sends();
    let app = ctx.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/github/disconnect")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert!(
        installations::find_by_organization(ctx.pool.connection(), org_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[actix_rt::test]
async fn test_status_without_integration_is_disconnected() {
    let ctx = TestContext::new().await;
    let (user_id, _) = ctx.create_user(1, "octocat").await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/status")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!({ "connected": false }));
}

#[actix_rt::test]
async fn test_status_connected() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    ctx.github.installation(55, "acme").await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/status")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["connected"], true);
    assert_eq!(body["installationId"], 55);
    assert_eq!(body["accountLogin"], "acme");
    assert_eq!(body["accountType"], "Organization");
    assert_eq!(body["permissions"]["issues"], "read");
}

#[actix_rt::test]
async fn test_status_removed_installation_cleans_up_without_event() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    ctx.github.installation_status(55, 404).await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/status")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!({ "connected": false }));
    assert!(
        installations::find_by_organization(ctx.pool.connection(), org_id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(ctx.queue.events().is_empty());
}

#[actix_rt::test]
async fn test_status_github_error_keeps_row() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    ctx.github.installation_status(55, 502).await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/github/status")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body,
        json!({ "connected": false, "error": "Failed to verify integration" })
    );
    assert!(
        installations::find_by_organization(ctx.pool.connection(), org_id)
            .await
            .unwrap()
            .is_some()
    );
}

#[actix_rt::test]
async fn test_sync_links_first_installation() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.github
        .installations(vec![installation_json(61, "acme"), installation_json(62, "globex")])
        .await;
    ctx.github.access_token(61, "ghs_synced").await;
    let app = ctx.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/github/sync")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "installation": { "id": 61, "accountLogin": "acme", "accountType": "Organization" }
        })
    );
    assert_eq!(
        installations::resolve_organization(ctx.pool.connection(), 61)
            .await
            .unwrap(),
        Some(org_id)
    );
    assert!(ctx.queue.events().is_empty());
}

#[actix_rt::test]
async fn test_sync_with_existing_integration_rejected() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    let app = ctx.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/github/sync")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "Integration already exists" }));
    assert_eq!(ctx.github.request_count().await, 0);
}

#[actix_rt::test]
async fn test_sync_without_installations_not_found() {
    let ctx = TestContext::new().await;
    let (user_id, _) = ctx.create_user(1, "octocat").await;
    ctx.github.installations(vec![]).await;
    let app = ctx.app().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/github/sync")
        .cookie(ctx.session_cookie(user_id, "octocat"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
}
