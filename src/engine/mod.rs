//! Lifecycle engine orchestrating airlock request mutations.
//!
//! Every mutation follows the same shape: validate, write through the
//! store's conditional-write primitive, then publish the status-changed
//! event followed by the stakeholder notification. Creation additionally
//! compensates: if publishing fails the just-created record is deleted
//! again, so a request is never left in the store with an unsent creation
//! notification (see [`saga`]). Updates keep the store write when
//! publishing fails and report [`AirlockError::NotificationUpdateUnavailable`]
//! instead.
//!
//! The engine is stateless per call; callers pass the request copy they
//! read, and its version token arbitrates concurrent writers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use crate::error::{AirlockError, Result};
use crate::events::{EventPublisher, NotificationEvent, StatusChangedEvent};
use crate::identity::{Role, RoleAssignmentDirectory, User, UserRef};
use crate::request::{
    AirlockFile, AirlockRequest, AirlockRequestInput, AirlockReview, AirlockReviewInput,
    RequestId, RequestStatus, RequestWithActions, ReviewId, ReviewVmRef, allowed_actions,
};
use crate::store::{RequestFilter, RequestStore};
use crate::workspace::Workspace;

mod saga;

/// Field changes applied by a single update operation.
///
/// Everything is optional. An update without `new_status` is a pure field
/// update and publishes no events.
#[derive(Debug, Clone, Default)]
pub struct RequestUpdate {
    pub new_status: Option<RequestStatus>,
    pub files: Option<Vec<AirlockFile>>,
    pub status_message: Option<String>,
    pub review: Option<AirlockReview>,
    pub review_vm: Option<ReviewVmRef>,
}

impl RequestUpdate {
    /// An update that only moves the request to `new_status`.
    pub fn status(new_status: RequestStatus) -> Self {
        RequestUpdate {
            new_status: Some(new_status),
            ..Default::default()
        }
    }

    /// An update that only links a review VM.
    pub fn review_vm(vm: ReviewVmRef) -> Self {
        RequestUpdate {
            review_vm: Some(vm),
            ..Default::default()
        }
    }
}

/// Orchestrates create/update/review operations for airlock requests.
pub struct LifecycleEngine<S, P, D> {
    store: Arc<S>,
    publisher: Arc<P>,
    directory: Arc<D>,
}

impl<S, P, D> LifecycleEngine<S, P, D>
where
    S: RequestStore,
    P: EventPublisher,
    D: RoleAssignmentDirectory,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, directory: Arc<D>) -> Self {
        LifecycleEngine {
            store,
            publisher,
            directory,
        }
    }

    /// Create a draft request in `workspace`.
    ///
    /// The notification contact check runs before anything is persisted;
    /// a workspace nobody can be notified about never gets a request.
    #[tracing::instrument(skip_all, fields(workspace_id = %workspace.id, request_type = %input.request_type))]
    pub async fn create_request(
        &self,
        input: AirlockRequestInput,
        created_by: &User,
        workspace: &Workspace,
    ) -> Result<AirlockRequest> {
        if !workspace.airlock_enabled() {
            return Err(AirlockError::AirlockNotEnabled);
        }
        input.validate()?;
        let recipients = self.notification_contacts(workspace).await?;

        let request = AirlockRequest::draft(input, created_by, workspace.id);
        tracing::debug!(request_id = %request.id, "Saving draft airlock request");

        let persisted = saga::PersistedDraft::persist(self.store.as_ref(), request).await?;
        let request = persisted
            .publish(self.publisher.as_ref(), recipients)
            .await?;

        counter!(
            "airlock_requests_created_total",
            "type" => request.request_type.as_str()
        )
        .increment(1);
        tracing::info!(request_id = %request.id, "Airlock request created");
        Ok(request)
    }

    /// Apply `update` to `request` and publish the resulting events.
    ///
    /// A requested status change is checked against the transition table
    /// before any write; an illegal change mutates nothing. The store write
    /// uses the version token from the caller's copy, so a stale copy fails
    /// with a conflict instead of overwriting a concurrent update.
    #[tracing::instrument(skip(self, request, updated_by, workspace, update), fields(request_id = %request.id, new_status = tracing::field::Empty))]
    pub async fn update_request(
        &self,
        request: &AirlockRequest,
        updated_by: &User,
        workspace: &Workspace,
        update: RequestUpdate,
    ) -> Result<AirlockRequest> {
        let previous_status = request.status;

        if let Some(target) = update.new_status {
            tracing::Span::current().record("new_status", target.as_str());
            if !previous_status.can_transition_to(target) {
                counter!(
                    "airlock_illegal_transitions_total",
                    "from" => previous_status.as_str(),
                    "to" => target.as_str()
                )
                .increment(1);
                tracing::warn!(
                    from = %previous_status,
                    to = %target,
                    "Rejected illegal status change"
                );
                return Err(AirlockError::IllegalStatusChange {
                    from: previous_status,
                    to: target,
                });
            }
        }

        let status_changed = update.new_status.is_some();
        let updated = apply_update(request, updated_by, update);
        let stored = self
            .store
            .update(&updated, request.version)
            .await
            .map_err(map_store_error)?;

        if !status_changed {
            tracing::debug!("No status change, skipping events");
            return Ok(stored);
        }

        counter!(
            "airlock_status_transitions_total",
            "from" => previous_status.as_str(),
            "to" => stored.status.as_str()
        )
        .increment(1);

        // The store write is kept even when publishing fails.
        if let Err(e) = self
            .publish_status_events(&stored, Some(previous_status), workspace)
            .await
        {
            counter!("airlock_publish_failures_total", "phase" => "update").increment(1);
            tracing::error!(error = %e, "Failed publishing status change events");
            return Err(AirlockError::NotificationUpdateUnavailable);
        }

        Ok(stored)
    }

    /// Move a request to `submitted`.
    pub async fn submit_request(
        &self,
        request: &AirlockRequest,
        updated_by: &User,
        workspace: &Workspace,
    ) -> Result<AirlockRequest> {
        self.update_request(
            request,
            updated_by,
            workspace,
            RequestUpdate::status(RequestStatus::Submitted),
        )
        .await
    }

    /// Move a request to `cancelled`.
    pub async fn cancel_request(
        &self,
        request: &AirlockRequest,
        updated_by: &User,
        workspace: &Workspace,
    ) -> Result<AirlockRequest> {
        self.update_request(
            request,
            updated_by,
            workspace,
            RequestUpdate::status(RequestStatus::Cancelled),
        )
        .await
    }

    /// Construct a review record for `reviewer`'s decision.
    ///
    /// Applies no status change; the caller combines the record with an
    /// update to the matching in-progress status.
    pub fn record_review(
        &self,
        input: AirlockReviewInput,
        reviewer: &User,
    ) -> Result<AirlockReview> {
        input.validate()?;
        Ok(AirlockReview {
            id: ReviewId::from(uuid::Uuid::new_v4()),
            decision: input.decision,
            decision_explanation: input.decision_explanation,
            reviewer: UserRef::from(reviewer),
            created_at: Utc::now(),
        })
    }

    /// Get a request by id.
    pub async fn get_request(&self, id: RequestId) -> Result<AirlockRequest> {
        self.store.get(id).await.map_err(map_store_error)
    }

    /// List requests matching `filter`.
    pub async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<AirlockRequest>> {
        self.store.list(filter).await.map_err(map_store_error)
    }

    /// List requests matching `filter`, each paired with the actions `user`
    /// may take on it.
    pub async fn list_requests_with_actions(
        &self,
        filter: RequestFilter,
        user: &User,
    ) -> Result<Vec<RequestWithActions>> {
        let requests = self.list_requests(filter).await?;
        Ok(requests
            .into_iter()
            .map(|request| {
                let actions = allowed_actions(&request, user);
                RequestWithActions {
                    request,
                    allowed_actions: actions,
                }
            })
            .collect())
    }

    /// Resolve notification contacts, requiring researcher and manager
    /// coverage.
    async fn notification_contacts(
        &self,
        workspace: &Workspace,
    ) -> Result<HashMap<Role, Vec<String>>> {
        let contacts = self.directory.workspace_role_contacts(workspace).await?;
        for role in [Role::WorkspaceResearcher, Role::AirlockManager] {
            if contacts.get(&role).is_none_or(|c| c.is_empty()) {
                tracing::error!(role = %role, "No notification contact registered for role");
                return Err(AirlockError::MissingNotificationContact(role));
            }
        }
        Ok(contacts)
    }

    /// Status-changed first, then the stakeholder notification.
    async fn publish_status_events(
        &self,
        request: &AirlockRequest,
        previous_status: Option<RequestStatus>,
        workspace: &Workspace,
    ) -> Result<()> {
        self.publisher
            .publish_status_changed(StatusChangedEvent::for_request(request, previous_status))
            .await?;
        let recipients = self.directory.workspace_role_contacts(workspace).await?;
        self.publisher
            .publish_notification(NotificationEvent::status_changed(request, recipients))
            .await
    }
}

/// Merge an update into a working copy, stamping the updater identity.
fn apply_update(request: &AirlockRequest, updated_by: &User, update: RequestUpdate) -> AirlockRequest {
    let mut updated = request.clone();
    let RequestUpdate {
        new_status,
        files,
        status_message,
        review,
        review_vm,
    } = update;
    if let Some(status) = new_status {
        updated.status = status;
    }
    if let Some(files) = files {
        updated.files = files;
    }
    if let Some(message) = status_message {
        updated.status_message = Some(message);
    }
    if let Some(review) = review {
        updated.reviews.push(review);
    }
    if let Some(vm) = review_vm {
        updated.review_vms.push(vm);
    }
    updated.updated_by = UserRef::from(updated_by);
    updated.updated_at = Utc::now();
    updated
}

/// Conflicts and missing documents keep their meaning; everything else the
/// store reports collapses into an opaque unavailability error after being
/// logged here.
fn map_store_error(error: AirlockError) -> AirlockError {
    match error {
        AirlockError::VersionConflict(_) | AirlockError::NotFound(_) => error,
        other => {
            tracing::error!(error = %other, "State store operation failed");
            AirlockError::StoreUnavailable
        }
    }
}
