//! Installation directory and default organization behaviour.

use starsling_lib::db::{installations, organizations, users};
use starsling_lib::models::InstallationMetadata;
use starsling_lib::models::installation::PROVIDER_GITHUB;
use starsling_lib::models::user::GitHubUserInfo;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_resolve_unknown_installation_is_none() {
    let ctx = TestContext::new().await;
    let resolved = installations::resolve_organization(ctx.pool.connection(), 123456)
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[actix_rt::test]
async fn test_resolve_linked_installation() {
    let ctx = TestContext::new().await;
    let (_, org_id) = ctx.create_user(1, "octocat").await;
    ctx.link_installation(org_id, 77, "acme").await;

    let resolved = installations::resolve_organization(ctx.pool.connection(), 77)
        .await
        .unwrap();
    assert_eq!(resolved, Some(org_id));
}

#[actix_rt::test]
async fn test_upsert_twice_keeps_one_row_with_latest_values() {
    let ctx = TestContext::new().await;
    let (_, org_id) = ctx.create_user(1, "octocat").await;
    let db = ctx.pool.connection();

    let mut metadata = InstallationMetadata {
        installation_id: 10,
        account_id: 500,
        account_type: "Organization".to_string(),
        account_login: "acme".to_string(),
        permissions: Default::default(),
        events: vec![],
    };
    installations::upsert_installation(db, org_id, PROVIDER_GITHUB, "first", &metadata)
        .await
        .unwrap();

    metadata.installation_id = 11;
    metadata.account_login = "acme-renamed".to_string();
    installations::upsert_installation(db, org_id, PROVIDER_GITHUB, "second", &metadata)
        .await
        .unwrap();

    assert_eq!(installations::count_by_organization(db, org_id).await.unwrap(), 1);

    let row = installations::find_by_organization(db, org_id)
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(row.installation_id, 11);
    assert_eq!(row.access_token, "second");
    assert_eq!(
        installations::metadata_of(&row).unwrap().account_login,
        "acme-renamed"
    );

    // The previous installation id no longer resolves.
    assert!(
        installations::resolve_organization(db, 10)
            .await
            .unwrap()
            .is_none()
    );
}

#[actix_rt::test]
async fn test_default_organization_created_once() {
    let ctx = TestContext::new().await;
    let (user_id, org_id) = ctx.create_user(1, "octocat").await;

    let again = organizations::get_or_create_default(ctx.pool.connection(), user_id)
        .await
        .unwrap();
    assert_eq!(again.id, org_id);
    assert_eq!(again.slug, organizations::default_slug(org_id));

    let role = organizations::user_role(ctx.pool.connection(), user_id, org_id)
        .await
        .unwrap();
    assert_eq!(role.as_deref(), Some(organizations::ROLE_OWNER));
}

#[actix_rt::test]
async fn test_user_upsert_refreshes_profile_and_keeps_id() {
    let ctx = TestContext::new().await;
    let mut profile = GitHubUserInfo {
        id: 583231,
        login: "octocat".to_string(),
        name: None,
        avatar_url: None,
        email: None,
    };
    let first = users::upsert_from_github(ctx.pool.connection(), &profile)
        .await
        .unwrap();

    profile.login = "octocat-renamed".to_string();
    profile.name = Some("The Octocat".to_string());
    let second = users::upsert_from_github(ctx.pool.connection(), &profile)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.username, "octocat-renamed");
    assert_eq!(second.display_name.as_deref(), Some("The Octocat"));
    assert_eq!(second.created_at, first.created_at);
}

#[actix_rt::test]
async fn test_users_created_back_to_back_get_distinct_organizations() {
    let ctx = TestContext::new().await;
    let (_, first_org) = ctx.create_user(1, "octocat").await;
    let (_, second_org) = ctx.create_user(2, "hubot").await;
    let (_, third_org) = ctx.create_user(3, "monalisa").await;

    assert_ne!(first_org, second_org);
    assert_ne!(second_org, third_org);

    let slugs: Vec<String> = [first_org, second_org, third_org]
        .into_iter()
        .map(organizations::default_slug)
        .collect();
    assert_ne!(slugs[0], slugs[1]);
    assert_ne!(slugs[1], slugs[2]);
}
