//! Issue synchronizer against a real database.

use sea_orm::{EntityTrait, PaginatorTrait};

use starsling_lib::entity::{issue, repository};
use starsling_lib::models::{GitHubIssue, GitHubRepository, IssueAction};
use starsling_lib::services::issue_sync::{IngestOutcome, ingest_issue};

use super::test_helpers::*;

fn issue(github_id: i64, state: &str) -> GitHubIssue {
    serde_json::from_value(issue_json(github_id, 7, state)).unwrap()
}

fn repo() -> GitHubRepository {
    serde_json::from_value(repository_json(3001, "widgets")).unwrap()
}

#[actix_rt::test]
async fn test_ingest_twice_is_idempotent() {
    let ctx = TestContext::new().await;
    let (_, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    let db = ctx.pool.connection();

    let first = ingest_issue(db, 55, &issue(9001, "open"), &repo(), IssueAction::Opened)
        .await
        .unwrap();
    let second = ingest_issue(db, 55, &issue(9001, "open"), &repo(), IssueAction::Opened)
        .await
        .unwrap();

    let IngestOutcome::Created { issue_id } = first else {
        panic!("expected Created, got {:?}", first);
    };
    assert_eq!(second, IngestOutcome::Updated { issue_id });

    assert_eq!(repository::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(issue::Entity::find().count(db).await.unwrap(), 1);

    let stored = issue::Entity::find_by_id(issue_id).one(db).await.unwrap().unwrap();
    assert_eq!(stored.organization_id, org_id);
    assert_eq!(stored.number, "7");
    assert_eq!(stored.author, "octocat");
    assert_eq!(stored.assignees, serde_json::json!(["hubot"]));
    assert_eq!(stored.labels, serde_json::json!(["bug"]));
    assert_eq!(stored.comments_count, "2");
    assert_eq!(stored.reactions_count, "5");
    assert!(stored.metadata.get("pullRequest").is_none());
}

#[actix_rt::test]
async fn test_close_overwrites_state() {
    let ctx = TestContext::new().await;
    let (_, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    let db = ctx.pool.connection();

    ingest_issue(db, 55, &issue(9001, "open"), &repo(), IssueAction::Opened)
        .await
        .unwrap();
    let mut closed = issue(9001, "closed");
    closed.title = "Renamed".to_string();
    closed.labels = None;
    ingest_issue(db, 55, &closed, &repo(), IssueAction::Closed)
        .await
        .unwrap();

    let stored = issue::Entity::find().one(db).await.unwrap().unwrap();
    assert_eq!(stored.state, "closed");
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.labels, serde_json::json!([]));
    assert!(stored.updated_at >= stored.created_at);
}

#[actix_rt::test]
async fn test_unknown_installation_is_skipped() {
    let ctx = TestContext::new().await;
    let db = ctx.pool.connection();

    let outcome = ingest_issue(db, 404, &issue(9001, "open"), &repo(), IssueAction::Opened)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::SkippedUnknownInstallation);
    assert_eq!(repository::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(issue::Entity::find().count(db).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_pull_request_metadata_kept() {
    let ctx = TestContext::new().await;
    let (_, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 55, "acme").await;
    let db = ctx.pool.connection();

    let mut raw = issue_json(9002, 8, "open");
    raw["pull_request"] = serde_json::json!({
        "url": "https://api.github.com/repos/acme/widgets/pulls/8",
        "html_url": "https://github.com/acme/widgets/pull/8"
    });
    let pr: GitHubIssue = serde_json::from_value(raw).unwrap();

    ingest_issue(db, 55, &pr, &repo(), IssueAction::Opened)
        .await
        .unwrap();

    let stored = issue::Entity::find().one(db).await.unwrap().unwrap();
    assert_eq!(
        stored.metadata["pullRequest"]["htmlUrl"],
        "https://github.com/acme/widgets/pull/8"
    );
}
