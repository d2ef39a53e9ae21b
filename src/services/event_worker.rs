//! Consumer for the in-memory event queue.
//!
//! Runs the event handlers on a single tokio task, retrying failed events a
//! fixed number of times the way the hosted queue does.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::Event;
use crate::services::event_handlers::EventHandlers;

/// Attempts per event, including the first.
pub const MAX_ATTEMPTS: u32 = 4;

/// Retry delay settings.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Spawn the worker. It exits when every sender is dropped.
pub fn start_event_worker(
    mut receiver: broadcast::Receiver<Event>,
    handlers: EventHandlers,
    policy: RetryPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(max_attempts = policy.max_attempts, "Event worker started");
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    process_with_retry(&handlers, &event, policy).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event worker lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Event queue closed, worker stopping");
                    break;
                }
            }
        }
    })
}

/// Run the handler for `event`, retrying with linear backoff. Returns whether it succeeded.
pub async fn process_with_retry(handlers: &EventHandlers, event: &Event, policy: RetryPolicy) -> bool {
    let name = event.name();
    for attempt in 1..=policy.max_attempts {
        match handlers.handle(event).await {
            Ok(outcome) => {
                info!(event = %name, attempt, outcome = ?outcome, "Event handled");
                return true;
            }
            Err(e) if attempt < policy.max_attempts => {
                warn!(event = %name, attempt, error = %e, "Event handler failed, retrying");
                tokio::time::sleep(policy.base_delay * attempt).await;
            }
            Err(e) => {
                error!(event = %name, attempt, error = %e, "Event handler failed, giving up");
            }
        }
    }
    false
}
