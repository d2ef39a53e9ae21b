//! Typed event envelopes sent to the event queue.
//!
//! On the wire an event is `{"name": "github/<event>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::github::{GitHubIssue, GitHubRepository, RepositoryRef};

/// Prefix applied to every event name on the wire.
pub const EVENT_NAME_PREFIX: &str = "github/";

/// Closed set of events this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    InstallationCreated,
    InstallationDeleted,
    InstallationRepositoriesChanged,
    IssuesOpened,
    IssuesClosed,
    IssuesEdited,
    IssuesReopened,
}

impl EventName {
    pub const ALL: [EventName; 7] = [
        EventName::InstallationCreated,
        EventName::InstallationDeleted,
        EventName::InstallationRepositoriesChanged,
        EventName::IssuesOpened,
        EventName::IssuesClosed,
        EventName::IssuesEdited,
        EventName::IssuesReopened,
    ];

    /// Unprefixed name, e.g. `issues.opened`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::InstallationCreated => "installation.created",
            EventName::InstallationDeleted => "installation.deleted",
            EventName::InstallationRepositoriesChanged => "installation.repositories.changed",
            EventName::IssuesOpened => "issues.opened",
            EventName::IssuesClosed => "issues.closed",
            EventName::IssuesEdited => "issues.edited",
            EventName::IssuesReopened => "issues.reopened",
        }
    }

    /// Name as sent to the queue, e.g. `github/issues.opened`.
    pub fn wire_name(&self) -> String {
        format!("{}{}", EVENT_NAME_PREFIX, self.as_str())
    }

    /// Parse a wire name (prefixed or bare).
    pub fn parse(s: &str) -> Option<Self> {
        let bare = s.strip_prefix(EVENT_NAME_PREFIX).unwrap_or(s);
        Self::ALL.into_iter().find(|n| n.as_str() == bare)
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue webhook actions that are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueAction {
    Opened,
    Closed,
    Edited,
    Reopened,
}

impl IssueAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opened" => Some(Self::Opened),
            "closed" => Some(Self::Closed),
            "edited" => Some(Self::Edited),
            "reopened" => Some(Self::Reopened),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Edited => "edited",
            Self::Reopened => "reopened",
        }
    }

    pub fn event_name(&self) -> EventName {
        match self {
            Self::Opened => EventName::IssuesOpened,
            Self::Closed => EventName::IssuesClosed,
            Self::Edited => EventName::IssuesEdited,
            Self::Reopened => EventName::IssuesReopened,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationCreatedData {
    pub installation_id: i64,
    pub account_id: i64,
    pub account_type: String,
    pub account_login: String,
    pub organization_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationDeletedData {
    pub installation_id: i64,
    pub organization_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesChangedData {
    /// `added` or `removed`
    pub action: String,
    pub installation_id: i64,
    pub organization_id: Uuid,
    #[serde(default)]
    pub repositories_added: Vec<RepositoryRef>,
    #[serde(default)]
    pub repositories_removed: Vec<RepositoryRef>,
    pub repository_selection: Option<String>,
}

/// Raw issue and repository payloads forwarded for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueEventData {
    pub installation_id: i64,
    pub organization_id: Uuid,
    pub issue: GitHubIssue,
    pub repository: GitHubRepository,
}

/// Event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Event {
    #[serde(rename = "github/installation.created")]
    InstallationCreated(InstallationCreatedData),
    #[serde(rename = "github/installation.deleted")]
    InstallationDeleted(InstallationDeletedData),
    #[serde(rename = "github/installation.repositories.changed")]
    RepositoriesChanged(RepositoriesChangedData),
    #[serde(rename = "github/issues.opened")]
    IssuesOpened(IssueEventData),
    #[serde(rename = "github/issues.closed")]
    IssuesClosed(IssueEventData),
    #[serde(rename = "github/issues.edited")]
    IssuesEdited(IssueEventData),
    #[serde(rename = "github/issues.reopened")]
    IssuesReopened(IssueEventData),
}

impl Event {
    /// Build the issue event matching `action`.
    pub fn issue(action: IssueAction, data: IssueEventData) -> Self {
        match action {
            IssueAction::Opened => Event::IssuesOpened(data),
            IssueAction::Closed => Event::IssuesClosed(data),
            IssueAction::Edited => Event::IssuesEdited(data),
            IssueAction::Reopened => Event::IssuesReopened(data),
        }
    }

    pub fn name(&self) -> EventName {
        match self {
            Event::InstallationCreated(_) => EventName::InstallationCreated,
            Event::InstallationDeleted(_) => EventName::InstallationDeleted,
            Event::RepositoriesChanged(_) => EventName::InstallationRepositoriesChanged,
            Event::IssuesOpened(_) => EventName::IssuesOpened,
            Event::IssuesClosed(_) => EventName::IssuesClosed,
            Event::IssuesEdited(_) => EventName::IssuesEdited,
            Event::IssuesReopened(_) => EventName::IssuesReopened,
        }
    }

    pub fn installation_id(&self) -> i64 {
        match self {
            Event::InstallationCreated(d) => d.installation_id,
            Event::InstallationDeleted(d) => d.installation_id,
            Event::RepositoriesChanged(d) => d.installation_id,
            Event::IssuesOpened(d)
            | Event::IssuesClosed(d)
            | Event::IssuesEdited(d)
            | Event::IssuesReopened(d) => d.installation_id,
        }
    }

    pub fn organization_id(&self) -> Uuid {
        match self {
            Event::InstallationCreated(d) => d.organization_id,
            Event::InstallationDeleted(d) => d.organization_id,
            Event::RepositoriesChanged(d) => d.organization_id,
            Event::IssuesOpened(d)
            | Event::IssuesClosed(d)
            | Event::IssuesEdited(d)
            | Event::IssuesReopened(d) => d.organization_id,
        }
    }

    /// Issue action for issue events.
    pub fn issue_action(&self) -> Option<IssueAction> {
        match self {
            Event::IssuesOpened(_) => Some(IssueAction::Opened),
            Event::IssuesClosed(_) => Some(IssueAction::Closed),
            Event::IssuesEdited(_) => Some(IssueAction::Edited),
            Event::IssuesReopened(_) => Some(IssueAction::Reopened),
            _ => None,
        }
    }

    /// Check the fields each event declares as required.
    ///
    /// Returns the first missing field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.installation_id() <= 0 {
            return Err("installationId");
        }
        if self.organization_id().is_nil() {
            return Err("organizationId");
        }

        match self {
            Event::InstallationCreated(d) => {
                if d.account_login.trim().is_empty() {
                    return Err("accountLogin");
                }
                if d.account_type.trim().is_empty() {
                    return Err("accountType");
                }
            }
            Event::InstallationDeleted(_) => {}
            Event::RepositoriesChanged(d) => {
                if d.action != "added" && d.action != "removed" {
                    return Err("action");
                }
            }
            Event::IssuesOpened(d)
            | Event::IssuesClosed(d)
            | Event::IssuesEdited(d)
            | Event::IssuesReopened(d) => {
                if d.issue.id <= 0 {
                    return Err("issue.id");
                }
                if d.repository.id <= 0 {
                    return Err("repository.id");
                }
                if d.repository.full_name.trim().is_empty() {
                    return Err("repository.full_name");
                }
            }
        }

        Ok(())
    }
}
