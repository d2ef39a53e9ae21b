//! Idempotent mirroring of GitHub issues and their repositories.

use sea_orm::DatabaseConnection;
use serde_json::{Map, Value as JsonValue};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::issues::IssueRecord;
use crate::db::{installations, issues, repositories};
use crate::error::AppResult;
use crate::models::github::{GitHubIssue, GitHubRepository};
use crate::models::IssueAction;

/// Result of one ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created { issue_id: Uuid },
    Updated { issue_id: Uuid },
    /// No organization is linked to the installation; the event is dropped.
    SkippedUnknownInstallation,
}

/// Upsert the repository and issue carried by an issue event.
///
/// Safe to re-run: a second call with the same payload overwrites the row with
/// identical values. Database errors propagate so the queue retries.
pub async fn ingest_issue(
    db: &DatabaseConnection,
    installation_id: i64,
    issue: &GitHubIssue,
    repository: &GitHubRepository,
    action: IssueAction,
) -> AppResult<IngestOutcome> {
    let Some(organization_id) = installations::resolve_organization(db, installation_id).await?
    else {
        warn!(
            installation_id,
            repository = %repository.full_name,
            issue_number = issue.number,
            "No matching installation found for issue event"
        );
        return Ok(IngestOutcome::SkippedUnknownInstallation);
    };

    let repository_id = match repositories::find_by_github_id(db, repository.id).await? {
        Some(existing) => existing.id,
        None => {
            let created = repositories::insert_from_github(db, organization_id, repository).await?;
            info!(
                repository = %repository.full_name,
                organization_id = %organization_id,
                "Created repository"
            );
            created.id
        }
    };

    let record = derive_issue_record(issue, action);

    let outcome = match issues::find_by_github_id(db, issue.id).await? {
        Some(existing) => {
            let updated = issues::overwrite(db, existing, organization_id, repository_id, record).await?;
            info!(
                github_id = issue.id,
                number = issue.number,
                action = action.as_str(),
                "Updated existing issue"
            );
            IngestOutcome::Updated { issue_id: updated.id }
        }
        None => {
            let created = issues::insert(db, organization_id, repository_id, record).await?;
            info!(
                github_id = issue.id,
                number = issue.number,
                action = action.as_str(),
                "Created new issue"
            );
            IngestOutcome::Created { issue_id: created.id }
        }
    };

    Ok(outcome)
}

/// Stored state: the provider's `open`/`closed`, falling back to the action.
fn derive_state(state: &str, action: IssueAction) -> String {
    match state {
        "open" | "closed" => state.to_string(),
        _ if action == IssueAction::Closed => "closed".to_string(),
        _ => "open".to_string(),
    }
}

/// Map a provider issue onto the stored columns.
pub fn derive_issue_record(issue: &GitHubIssue, action: IssueAction) -> IssueRecord {
    let mut metadata = Map::new();
    if let Some(pr) = &issue.pull_request {
        metadata.insert(
            "pullRequest".to_string(),
            serde_json::json!({
                "url": pr.url,
                "htmlUrl": pr.html_url,
                "diffUrl": pr.diff_url,
                "patchUrl": pr.patch_url,
            }),
        );
    }
    metadata.insert("closedAt".to_string(), serde_json::json!(issue.closed_at));
    metadata.insert("createdAt".to_string(), serde_json::json!(issue.created_at));
    metadata.insert("updatedAt".to_string(), serde_json::json!(issue.updated_at));

    IssueRecord {
        github_id: issue.id,
        number: issue.number.to_string(),
        title: issue.title.clone(),
        body: issue.body.clone(),
        state: derive_state(&issue.state, action),
        locked: issue.locked.unwrap_or(false),
        author: issue
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        author_association: issue.author_association.clone(),
        assignees: issue
            .assignees
            .as_ref()
            .map(|a| a.iter().map(|u| u.login.clone()).collect())
            .unwrap_or_default(),
        labels: issue
            .labels
            .as_ref()
            .map(|l| l.iter().map(|label| label.name.clone()).collect())
            .unwrap_or_default(),
        milestone: issue.milestone.as_ref().map(|m| m.title.clone()),
        comments_count: issue.comments.unwrap_or(0).to_string(),
        reactions_count: issue
            .reactions
            .as_ref()
            .and_then(|r| r.total_count)
            .unwrap_or(0)
            .to_string(),
        url: issue.url.clone(),
        html_url: issue.html_url.clone(),
        api_url: issue.url.clone(),
        metadata: JsonValue::Object(metadata),
    }
}
