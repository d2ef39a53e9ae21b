//! Handlers invoked by the event queue for each dispatched event.

use tracing::info;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::events::IssueEventData;
use crate::models::{Event, IssueAction};
use crate::services::issue_sync::{self, IngestOutcome};

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Logged,
    Ingested(IngestOutcome),
}

/// Dispatch target for queued events. Errors propagate so the queue retries.
#[derive(Clone)]
pub struct EventHandlers {
    pool: DbPool,
}

impl EventHandlers {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn handle(&self, event: &Event) -> AppResult<HandlerOutcome> {
        match event {
            Event::InstallationCreated(data) => {
                info!(
                    organization_id = %data.organization_id,
                    installation_id = data.installation_id,
                    account_id = data.account_id,
                    account_type = %data.account_type,
                    account_login = %data.account_login,
                    "GitHub App installed for organization"
                );
                Ok(HandlerOutcome::Logged)
            }
            Event::InstallationDeleted(data) => {
                info!(
                    organization_id = %data.organization_id,
                    installation_id = data.installation_id,
                    "GitHub App uninstalled for organization"
                );
                Ok(HandlerOutcome::Logged)
            }
            Event::RepositoriesChanged(data) => {
                info!(
                    action = %data.action,
                    organization_id = %data.organization_id,
                    installation_id = data.installation_id,
                    repositories_added = data.repositories_added.len(),
                    repositories_removed = data.repositories_removed.len(),
                    repository_selection = data.repository_selection.as_deref().unwrap_or("unknown"),
                    "Installation repositories changed"
                );
                Ok(HandlerOutcome::Logged)
            }
            Event::IssuesOpened(data) => self.ingest(data, IssueAction::Opened).await,
            Event::IssuesClosed(data) => self.ingest(data, IssueAction::Closed).await,
            Event::IssuesEdited(data) => self.ingest(data, IssueAction::Edited).await,
            Event::IssuesReopened(data) => self.ingest(data, IssueAction::Reopened).await,
        }
    }

    async fn ingest(&self, data: &IssueEventData, action: IssueAction) -> AppResult<HandlerOutcome> {
        info!(
            repository = %data.repository.full_name,
            issue_number = data.issue.number,
            title = %data.issue.title,
            installation_id = data.installation_id,
            action = action.as_str(),
            "Processing issue event"
        );
        let outcome = issue_sync::ingest_issue(
            self.pool.connection(),
            data.installation_id,
            &data.issue,
            &data.repository,
            action,
        )
        .await?;
        Ok(HandlerOutcome::Ingested(outcome))
    }
}
