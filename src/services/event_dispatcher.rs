//! Event dispatch to the at-least-once event queue.
//!
//! The dispatcher validates an envelope and hands it to an [`EventQueue`].
//! Success means the queue accepted the event; delivery and retries are the
//! queue's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::EventQueueSettings;
use crate::error::{AppError, AppResult};
use crate::models::Event;

/// Default capacity for the in-memory channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while handing an event to a queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("event queue rejected event: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no consumer is subscribed to the in-memory queue")]
    NoConsumer,

    #[error("event queue is not configured: {0}")]
    NotConfigured(&'static str),
}

/// A sink that accepts events for asynchronous processing.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Hand `event` to the queue. Returns once the queue has accepted it.
    async fn send(&self, event: &Event) -> Result<(), QueueError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Sends events to the Inngest event API (`POST {base}/e/{event_key}`).
pub struct InngestQueue {
    http: reqwest::Client,
    base_url: String,
    event_key: SecretString,
}

impl InngestQueue {
    pub fn new(settings: &EventQueueSettings) -> Result<Self, QueueError> {
        let event_key = settings
            .event_key
            .clone()
            .ok_or(QueueError::NotConfigured("INNGEST_EVENT_KEY"))?;

        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            event_key,
        })
    }
}

#[async_trait]
impl EventQueue for InngestQueue {
    async fn send(&self, event: &Event) -> Result<(), QueueError> {
        let url = format!("{}/e/{}", self.base_url, self.event_key.expose_secret());
        let response = self.http.post(&url).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueueError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "inngest"
    }
}

/// In-process queue backed by a broadcast channel.
///
/// Used in development and tests; `services::event_worker` consumes it.
#[derive(Clone)]
pub struct InMemoryQueue {
    sender: broadcast::Sender<Event>,
}

impl InMemoryQueue {
    /// Create a new queue with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events.
    /// Returns a receiver that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventQueue for InMemoryQueue {
    async fn send(&self, event: &Event) -> Result<(), QueueError> {
        self.sender
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| QueueError::NoConsumer)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Validates and forwards events. Holds no state beyond the queue handle.
#[derive(Clone)]
pub struct EventDispatcher {
    queue: Arc<dyn EventQueue>,
}

impl EventDispatcher {
    pub fn new(queue: Arc<dyn EventQueue>) -> Self {
        Self { queue }
    }

    pub fn backend(&self) -> &'static str {
        self.queue.backend()
    }

    /// Validate `event` and hand it to the queue.
    pub async fn emit(&self, event: Event) -> AppResult<()> {
        let name = event.name();

        if let Err(field) = event.validate() {
            warn!(event = %name, field, "Rejected event with missing field");
            return Err(AppError::Validation(format!(
                "Event {} is missing required field {}",
                name, field
            )));
        }

        self.queue.send(&event).await?;

        info!(
            event = %name,
            installation_id = event.installation_id(),
            organization_id = %event.organization_id(),
            backend = self.queue.backend(),
            "Event emitted"
        );
        Ok(())
    }
}
