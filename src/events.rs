//! Event publishing for airlock lifecycle notifications.
//!
//! Two event kinds leave this crate: a status-changed event consumed by the
//! platform's processing pipeline, and a stakeholder notification fanned out
//! to the contacts holding each workspace role. Delivery is at-least-once.
//! Within a single lifecycle operation the status-changed event is always
//! emitted before the matching notification; consumers rely on that order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{AirlockError, Result};
use crate::identity::Role;
use crate::request::{AirlockRequest, RequestId, RequestStatus, RequestType};
use crate::workspace::WorkspaceId;

/// Kind tag carried on stakeholder notifications.
pub const NOTIFICATION_STATUS_CHANGED: &str = "status_changed";

/// Emitted whenever a request's status changes (or on creation, with no
/// previous status).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChangedEvent {
    pub request_id: RequestId,
    pub new_status: RequestStatus,
    pub previous_status: Option<RequestStatus>,
    pub request_type: RequestType,
    pub workspace_id: WorkspaceId,
}

impl StatusChangedEvent {
    pub fn for_request(request: &AirlockRequest, previous_status: Option<RequestStatus>) -> Self {
        StatusChangedEvent {
            request_id: request.id,
            new_status: request.status,
            previous_status,
            request_type: request.request_type,
            workspace_id: request.workspace_id,
        }
    }
}

/// Emitted after a status-changed event to notify workspace stakeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub request_id: RequestId,
    pub event_type: String,
    pub event_value: String,
    pub recipients: HashMap<Role, Vec<String>>,
    pub workspace_id: WorkspaceId,
}

impl NotificationEvent {
    pub fn status_changed(
        request: &AirlockRequest,
        recipients: HashMap<Role, Vec<String>>,
    ) -> Self {
        NotificationEvent {
            request_id: request.id,
            event_type: NOTIFICATION_STATUS_CHANGED.to_string(),
            event_value: request.status.as_str().to_string(),
            recipients,
            workspace_id: request.workspace_id,
        }
    }
}

/// Trait for emitting lifecycle events to the platform's message bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Emit the status-changed event for a request.
    async fn publish_status_changed(&self, event: StatusChangedEvent) -> Result<()>;

    /// Emit the stakeholder notification for a request.
    async fn publish_notification(&self, event: NotificationEvent) -> Result<()>;
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

/// One recorded publish, in emission order across both kinds.
#[derive(Debug, Clone)]
pub enum PublishedEvent {
    StatusChanged(StatusChangedEvent),
    Notification(NotificationEvent),
}

/// Mock event publisher for testing.
///
/// Records every publish in a single ordered log so tests can assert both
/// counts and relative ordering, and supports failure injection per kind.
#[derive(Default)]
pub struct MockEventPublisher {
    published: Mutex<Vec<PublishedEvent>>,
    fail_status_changed: AtomicBool,
    fail_notifications: AtomicBool,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent status-changed publishes fail.
    pub fn fail_status_changed(&self, fail: bool) {
        self.fail_status_changed.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent notification publishes fail.
    pub fn fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    /// All recorded publishes, in emission order.
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published.lock().clone()
    }

    pub fn status_changed_events(&self) -> Vec<StatusChangedEvent> {
        self.published
            .lock()
            .iter()
            .filter_map(|e| match e {
                PublishedEvent::StatusChanged(e) => Some(e.clone()),
                PublishedEvent::Notification(_) => None,
            })
            .collect()
    }

    pub fn notification_events(&self) -> Vec<NotificationEvent> {
        self.published
            .lock()
            .iter()
            .filter_map(|e| match e {
                PublishedEvent::Notification(e) => Some(e.clone()),
                PublishedEvent::StatusChanged(_) => None,
            })
            .collect()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish_status_changed(&self, event: StatusChangedEvent) -> Result<()> {
        if self.fail_status_changed.load(Ordering::SeqCst) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected status-changed publish failure"
            )));
        }
        self.published
            .lock()
            .push(PublishedEvent::StatusChanged(event));
        Ok(())
    }

    async fn publish_notification(&self, event: NotificationEvent) -> Result<()> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected notification publish failure"
            )));
        }
        self.published
            .lock()
            .push(PublishedEvent::Notification(event));
        Ok(())
    }
}
