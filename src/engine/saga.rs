//! Two-phase creation: persist the draft, then publish the creation events,
//! compensating the persisted record when publishing fails.
//!
//! Phase one returns a [`PersistedDraft`], whose only way forward is phase
//! two. Splitting the phases into distinct values keeps each boundary
//! independently testable under failure injection.

use std::collections::HashMap;

use metrics::counter;

use crate::error::{AirlockError, Result};
use crate::events::{EventPublisher, NotificationEvent, StatusChangedEvent};
use crate::identity::Role;
use crate::request::AirlockRequest;
use crate::store::RequestStore;

/// A draft that has been written to the store but not yet announced.
pub(crate) struct PersistedDraft<'a, S: RequestStore + ?Sized> {
    store: &'a S,
    request: AirlockRequest,
}

impl<'a, S: RequestStore + ?Sized> std::fmt::Debug for PersistedDraft<'a, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedDraft")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<'a, S: RequestStore + ?Sized> PersistedDraft<'a, S> {
    /// Phase one: write the draft to the store.
    pub(crate) async fn persist(store: &'a S, request: AirlockRequest) -> Result<Self> {
        if let Err(e) = store.create(&request).await {
            tracing::error!(request_id = %request.id, error = %e, "Failed saving airlock request");
            return Err(AirlockError::StoreUnavailable);
        }
        Ok(PersistedDraft { store, request })
    }

    /// Phase two: emit status-changed (previous status: none) followed by
    /// the stakeholder notification.
    ///
    /// Any publish failure, including a timeout surfacing as an error,
    /// deletes the record written in phase one; a request is never left
    /// stored with an unsent creation notification.
    pub(crate) async fn publish<P: EventPublisher + ?Sized>(
        self,
        publisher: &P,
        recipients: HashMap<Role, Vec<String>>,
    ) -> Result<AirlockRequest> {
        let status_changed = StatusChangedEvent::for_request(&self.request, None);
        let notification = NotificationEvent::status_changed(&self.request, recipients);

        let published = match publisher.publish_status_changed(status_changed).await {
            Ok(()) => publisher.publish_notification(notification).await,
            Err(e) => Err(e),
        };

        match published {
            Ok(()) => Ok(self.request),
            Err(e) => {
                tracing::error!(
                    request_id = %self.request.id,
                    error = %e,
                    "Failed publishing creation events, removing stored request"
                );
                self.compensate().await;
                Err(AirlockError::NotificationUnavailable)
            }
        }
    }

    async fn compensate(&self) {
        counter!("airlock_publish_failures_total", "phase" => "create").increment(1);
        if let Err(e) = self.store.delete(self.request.id).await {
            tracing::error!(
                request_id = %self.request.id,
                error = %e,
                "Compensating delete failed, request left orphaned"
            );
        }
    }
}
