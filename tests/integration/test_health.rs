//! Liveness and readiness probes.

use actix_web::test;
use serde_json::Value;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health_reports_service() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "starsling");
}

#[actix_rt::test]
async fn test_ready_reports_queue_backend() {
    let ctx = TestContext::new().await;
    let app = ctx.app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/ready").to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["database"], "connected");
    assert_eq!(body["eventQueue"], "recording");
}
