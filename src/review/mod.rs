//! Review VM coordination for requests under manual review.
//!
//! A manager inspecting an in-review request can ask for a transient VM
//! with the request contents mounted. The coordinator resolves where that
//! VM lives from the workspace configuration, hands the actual provisioning
//! to the external deployment orchestrator, and links the resulting
//! resource to the request. When a review concludes, every linked VM gets
//! an uninstall dispatched, best effort.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{LifecycleEngine, RequestUpdate};
use crate::error::{AirlockError, Result};
use crate::events::EventPublisher;
use crate::identity::{RoleAssignmentDirectory, User};
use crate::request::{
    AirlockRequest, AirlockReviewInput, RequestStatus, ReviewDecision, ReviewVmRef,
};
use crate::store::RequestStore;
use crate::workspace::{ReviewVmTarget, UserResourceId, Workspace};

/// Unique identifier for an orchestrator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub Uuid);

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for OperationId {
    fn from(uuid: Uuid) -> Self {
        OperationId(uuid)
    }
}

/// What an orchestrator operation is doing to its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationAction {
    Install,
    Uninstall,
}

/// Progress marker at dispatch time; further tracking happens outside this
/// crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    AwaitingDeployment,
    AwaitingDeletion,
}

/// Handle for an asynchronous orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub resource_id: UserResourceId,
    pub action: OperationAction,
    pub status: OperationStatus,
}

/// Everything the orchestrator needs to create one review VM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewVmSpec {
    pub target: ReviewVmTarget,
    pub display_name: String,
    pub description: String,
}

/// Trait for the external resource deployment orchestrator.
///
/// Creates and destroys actual compute; this crate only consumes the
/// request/response contract.
#[async_trait]
pub trait ResourceOrchestrator: Send + Sync {
    /// Create a review VM and dispatch its deployment. The returned
    /// operation carries the id of the resource that was created.
    async fn deploy(&self, spec: ReviewVmSpec, requested_by: &User) -> Result<Operation>;

    /// Dispatch an uninstall for a previously created review VM.
    async fn uninstall(&self, vm: &ReviewVmRef, requested_by: &User) -> Result<Operation>;
}

/// Coordinates review VM provisioning and teardown around the lifecycle
/// engine.
pub struct ReviewVmCoordinator<S, P, D, O> {
    engine: Arc<LifecycleEngine<S, P, D>>,
    orchestrator: Arc<O>,
}

impl<S, P, D, O> ReviewVmCoordinator<S, P, D, O>
where
    S: RequestStore,
    P: EventPublisher,
    D: RoleAssignmentDirectory,
    O: ResourceOrchestrator,
{
    pub fn new(engine: Arc<LifecycleEngine<S, P, D>>, orchestrator: Arc<O>) -> Self {
        ReviewVmCoordinator {
            engine,
            orchestrator,
        }
    }

    /// Provision a review VM for an in-review request and link it.
    ///
    /// The link is a pure field update, so no lifecycle events fire here;
    /// the caller gets the updated request and the pending deployment.
    #[tracing::instrument(skip_all, fields(request_id = %request.id))]
    pub async fn create_review_vm(
        &self,
        request: &AirlockRequest,
        workspace: &Workspace,
        caller: &User,
    ) -> Result<(AirlockRequest, Operation)> {
        if request.status != RequestStatus::InReview {
            return Err(AirlockError::InvalidState(
                request.id,
                request.status.as_str().to_string(),
                RequestStatus::InReview.as_str().to_string(),
            ));
        }

        let target = workspace.review_vm_target(request.request_type)?;
        tracing::info!(
            workspace_id = %target.workspace_id,
            service_id = %target.workspace_service_id,
            template = %target.template_name,
            "Creating review VM"
        );

        let spec = ReviewVmSpec {
            display_name: "Airlock Review VM".to_string(),
            description: format!(
                "Airlock Review VM for request {} (ID {})",
                request.title, request.id.0
            ),
            target: target.clone(),
        };
        let operation = self.orchestrator.deploy(spec, caller).await?;
        counter!("airlock_review_vm_deploys_total").increment(1);

        let vm = ReviewVmRef {
            workspace_id: target.workspace_id,
            workspace_service_id: target.workspace_service_id,
            user_resource_id: operation.resource_id,
        };
        let updated = self
            .engine
            .update_request(request, caller, workspace, RequestUpdate::review_vm(vm))
            .await?;

        tracing::info!(
            resource_id = %operation.resource_id,
            vm_count = updated.review_vms.len(),
            "Review VM linked to request"
        );
        Ok((updated, operation))
    }

    /// Record `reviewer`'s decision and drive the request to the matching
    /// in-progress status, then tear down any linked review VMs.
    ///
    /// Teardown runs after the decision is committed, so its failures never
    /// undo the review; they only shrink the returned operation list.
    #[tracing::instrument(skip_all, fields(request_id = %request.id, decision = %input.decision))]
    pub async fn conclude_review(
        &self,
        request: &AirlockRequest,
        workspace: &Workspace,
        input: AirlockReviewInput,
        reviewer: &User,
    ) -> Result<(AirlockRequest, Vec<Operation>)> {
        let review = self.engine.record_review(input, reviewer)?;
        let new_status = match review.decision {
            ReviewDecision::Approved => RequestStatus::ApprovalInProgress,
            ReviewDecision::Rejected => RequestStatus::RejectionInProgress,
        };

        let update = RequestUpdate {
            new_status: Some(new_status),
            review: Some(review),
            ..Default::default()
        };
        let updated = self
            .engine
            .update_request(request, reviewer, workspace, update)
            .await?;

        let operations = self.teardown_review_vms(&updated, reviewer).await;
        Ok((updated, operations))
    }

    /// Dispatch uninstalls for every review VM linked to `request`.
    ///
    /// Dispatches run concurrently since the resources are independent.
    /// Individual failures are logged and skipped; the operations that did
    /// dispatch are returned.
    #[tracing::instrument(skip_all, fields(request_id = %request.id, vm_count = request.review_vms.len()))]
    pub async fn teardown_review_vms(
        &self,
        request: &AirlockRequest,
        caller: &User,
    ) -> Vec<Operation> {
        let dispatches = request.review_vms.iter().map(|vm| async move {
            match self.orchestrator.uninstall(vm, caller).await {
                Ok(operation) => {
                    counter!("airlock_review_vm_uninstalls_total").increment(1);
                    tracing::info!(
                        resource_id = %vm.user_resource_id,
                        operation_id = %operation.id,
                        "Review VM uninstall dispatched"
                    );
                    Some(operation)
                }
                Err(e) => {
                    tracing::warn!(
                        resource_id = %vm.user_resource_id,
                        error = %e,
                        "Review VM uninstall dispatch failed"
                    );
                    None
                }
            }
        });

        let operations: Vec<Operation> = futures::future::join_all(dispatches)
            .await
            .into_iter()
            .flatten()
            .collect();
        tracing::info!(dispatched = operations.len(), "Review VM teardown finished");
        operations
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

/// Mock deployment orchestrator for testing.
///
/// Records every deploy and uninstall, mints fresh resource/operation ids,
/// and supports failure injection globally or per resource.
#[derive(Default)]
pub struct MockOrchestrator {
    deploys: Mutex<Vec<ReviewVmSpec>>,
    uninstalls: Mutex<Vec<ReviewVmRef>>,
    fail_deploys: AtomicBool,
    fail_uninstalls_for: Mutex<Vec<UserResourceId>>,
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deploys fail.
    pub fn fail_deploys(&self, fail: bool) {
        self.fail_deploys.store(fail, Ordering::SeqCst);
    }

    /// Make uninstalls of one specific resource fail.
    pub fn fail_uninstall_for(&self, resource_id: UserResourceId) {
        self.fail_uninstalls_for.lock().push(resource_id);
    }

    /// Specs passed to `deploy`, in call order.
    pub fn deploy_calls(&self) -> Vec<ReviewVmSpec> {
        self.deploys.lock().clone()
    }

    /// Refs passed to `uninstall`, in call order.
    pub fn uninstall_calls(&self) -> Vec<ReviewVmRef> {
        self.uninstalls.lock().clone()
    }
}

#[async_trait]
impl ResourceOrchestrator for MockOrchestrator {
    async fn deploy(&self, spec: ReviewVmSpec, _requested_by: &User) -> Result<Operation> {
        self.deploys.lock().push(spec);
        if self.fail_deploys.load(Ordering::SeqCst) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected deploy failure"
            )));
        }
        Ok(Operation {
            id: OperationId::from(Uuid::new_v4()),
            resource_id: UserResourceId::from(Uuid::new_v4()),
            action: OperationAction::Install,
            status: OperationStatus::AwaitingDeployment,
        })
    }

    async fn uninstall(&self, vm: &ReviewVmRef, _requested_by: &User) -> Result<Operation> {
        self.uninstalls.lock().push(*vm);
        if self
            .fail_uninstalls_for
            .lock()
            .contains(&vm.user_resource_id)
        {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected uninstall failure"
            )));
        }
        Ok(Operation {
            id: OperationId::from(Uuid::new_v4()),
            resource_id: vm.user_resource_id,
            action: OperationAction::Uninstall,
            status: OperationStatus::AwaitingDeletion,
        })
    }
}
