//! Persistence abstraction for airlock request documents.
//!
//! The concrete document store lives outside this crate; the engine only
//! relies on point writes, a conditional update keyed on the document's
//! version token, and filtered listing. Concurrency safety is pushed to the
//! store's conditional write, so the engine itself takes no locks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::UserId;
use crate::request::{AirlockRequest, RequestId, RequestStatus, RequestType};
use crate::workspace::WorkspaceId;

pub mod memory;

/// Sort key for request listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    CreatedAt,
    UpdatedAt,
    Status,
}

/// Filter and ordering for request listings, always scoped to one workspace.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    pub workspace_id: WorkspaceId,
    pub creator: Option<UserId>,
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
    pub order_by: Option<OrderBy>,
    pub ascending: bool,
}

impl RequestFilter {
    pub fn for_workspace(workspace_id: WorkspaceId) -> Self {
        RequestFilter {
            workspace_id,
            creator: None,
            request_type: None,
            status: None,
            order_by: None,
            ascending: true,
        }
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, request_type: RequestType) -> Self {
        self.request_type = Some(request_type);
        self
    }

    pub fn created_by(mut self, creator: UserId) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn ordered_by(mut self, order_by: OrderBy, ascending: bool) -> Self {
        self.order_by = Some(order_by);
        self.ascending = ascending;
        self
    }
}

/// Storage trait for persisting and querying airlock requests.
///
/// Implementations own the persisted representation and the version tokens;
/// the engine holds only a transient working copy during an operation.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a brand new request document.
    async fn create(&self, request: &AirlockRequest) -> Result<()>;

    /// Conditionally replace a request document.
    ///
    /// Succeeds only when `expected_version` matches the stored version, in
    /// which case the stored version is bumped past it and the stored
    /// document is returned. A stale `expected_version` fails with
    /// [`crate::AirlockError::VersionConflict`] and leaves the stored
    /// document untouched.
    async fn update(
        &self,
        request: &AirlockRequest,
        expected_version: u64,
    ) -> Result<AirlockRequest>;

    /// Get a request by id.
    async fn get(&self, id: RequestId) -> Result<AirlockRequest>;

    /// Delete a request by id.
    async fn delete(&self, id: RequestId) -> Result<()>;

    /// List requests matching the filter, sorted per its ordering.
    async fn list(&self, filter: RequestFilter) -> Result<Vec<AirlockRequest>>;
}
