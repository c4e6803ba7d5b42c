use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::entities::mrp_request::RequestState;
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> ServiceResult<()> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping workflow event: {}", e);
        }
    }
}

/// Domain events emitted by the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    RequestCreated {
        request_id: i32,
        name: String,
    },
    RequestStateChanged {
        request_id: i32,
        from: RequestState,
        to: RequestState,
    },
    /// No BOM exists for the product; the request went to the design team.
    RequestRoutedToDesign {
        request_id: i32,
        assignee_id: Option<i32>,
    },
    ProductionCreated {
        production_id: i32,
        request_id: Option<i32>,
    },
    ProductionConfirmed {
        production_id: i32,
        workorders: usize,
    },
    ProductionCompleted(i32),
    ProductionDeleted(i32),
    SyncPropagationFailed {
        source: String,
        record_id: i32,
        reason: String,
    },
    RequestsPurged(usize),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::RequestCreated { .. } => "request_created",
            Event::RequestStateChanged { .. } => "request_state_changed",
            Event::RequestRoutedToDesign { .. } => "request_routed_to_design",
            Event::ProductionCreated { .. } => "production_created",
            Event::ProductionConfirmed { .. } => "production_confirmed",
            Event::ProductionCompleted(_) => "production_completed",
            Event::ProductionDeleted(_) => "production_deleted",
            Event::SyncPropagationFailed { .. } => "sync_propagation_failed",
            Event::RequestsPurged(_) => "requests_purged",
        }
    }
}

/// Drains the event channel, logging each event. Returns once every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SyncPropagationFailed {
                source,
                record_id,
                reason,
            } => {
                warn!(
                    event = event.name(),
                    source = %source,
                    record_id = *record_id,
                    "Sync propagation failed: {}",
                    reason
                );
            }
            other => {
                info!(event = other.name(), payload = ?other, "Workflow event");
            }
        }
    }

    info!("Event processing loop stopped");
}
