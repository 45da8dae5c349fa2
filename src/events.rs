//! Project lifecycle events.
//!
//! Mutating operations announce themselves to the rest of the platform
//! (webhooks, replication, audit) through an [`EventPublisher`]. Delivery is
//! fire-and-forget with an at-most-once attempt: publish failures are the
//! publisher's problem and never surface to the request that triggered them.

use crate::types::ProjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project lifecycle event with its operator metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectEvent {
    Created {
        project_id: ProjectId,
        project: String,
        operator: String,
    },
    Deleted {
        project_id: ProjectId,
        project: String,
        operator: String,
    },
}

impl ProjectEvent {
    pub fn project_id(&self) -> ProjectId {
        match self {
            ProjectEvent::Created { project_id, .. } | ProjectEvent::Deleted { project_id, .. } => *project_id,
        }
    }
}

/// Contract the lifecycle controller requires from the event bus.
///
/// Implementations own their failure handling; `publish` is infallible at
/// the call site.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: ProjectEvent);
}

/// Default publisher: emits the event to the structured log stream.
///
/// Stands in for the platform event bus when none is wired up; the transport
/// behind the trait is outside this crate.
pub struct TracingEventPublisher;

#[async_trait::async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: ProjectEvent) {
        let event_id = Uuid::new_v4();
        match serde_json::to_string(&event) {
            Ok(payload) => {
                tracing::info!(%event_id, project_id = event.project_id(), %payload, "project event published")
            }
            Err(e) => tracing::warn!(%event_id, "failed to serialize project event: {e}"),
        }
    }
}
