//! In-memory request store.
//!
//! Backs tests and local development. Mirrors the conditional-write
//! semantics a production document store provides, records the calls the
//! consistency contract cares about (creates and compensating deletes), and
//! supports failure injection per operation kind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{AirlockError, Result};
use crate::request::{AirlockRequest, RequestId};

use super::{OrderBy, RequestFilter, RequestStore};

/// Request store holding documents in a process-local map.
#[derive(Default)]
pub struct InMemoryRequestStore {
    items: Mutex<HashMap<RequestId, AirlockRequest>>,
    create_calls: AtomicUsize,
    delete_calls: Mutex<Vec<RequestId>>,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create` calls fail with an opaque store error.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `update` calls fail with an opaque store error.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `delete` calls fail with an opaque store error.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of `create` calls made, including failed ones.
    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Ids passed to `delete`, in call order.
    pub fn delete_calls(&self) -> Vec<RequestId> {
        self.delete_calls.lock().clone()
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn create(&self, request: &AirlockRequest) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected create failure"
            )));
        }
        let mut items = self.items.lock();
        if items.contains_key(&request.id) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "document {} already exists",
                request.id
            )));
        }
        items.insert(request.id, request.clone());
        Ok(())
    }

    async fn update(
        &self,
        request: &AirlockRequest,
        expected_version: u64,
    ) -> Result<AirlockRequest> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected update failure"
            )));
        }
        let mut items = self.items.lock();
        let stored = items
            .get_mut(&request.id)
            .ok_or(AirlockError::NotFound(request.id))?;
        if stored.version != expected_version {
            return Err(AirlockError::VersionConflict(request.id));
        }
        let mut updated = request.clone();
        updated.version = expected_version + 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn get(&self, id: RequestId) -> Result<AirlockRequest> {
        self.items
            .lock()
            .get(&id)
            .cloned()
            .ok_or(AirlockError::NotFound(id))
    }

    async fn delete(&self, id: RequestId) -> Result<()> {
        self.delete_calls.lock().push(id);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AirlockError::Other(anyhow::anyhow!(
                "injected delete failure"
            )));
        }
        self.items
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(AirlockError::NotFound(id))
    }

    async fn list(&self, filter: RequestFilter) -> Result<Vec<AirlockRequest>> {
        let mut matched: Vec<AirlockRequest> = self
            .items
            .lock()
            .values()
            .filter(|r| r.workspace_id == filter.workspace_id)
            .filter(|r| filter.creator.is_none_or(|c| r.created_by.id == c))
            .filter(|r| filter.request_type.is_none_or(|t| r.request_type == t))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();

        if let Some(order_by) = filter.order_by {
            match order_by {
                OrderBy::CreatedAt => matched.sort_by_key(|r| r.created_at),
                OrderBy::UpdatedAt => matched.sort_by_key(|r| r.updated_at),
                OrderBy::Status => matched.sort_by_key(|r| r.status.as_str()),
            }
            if !filter.ascending {
                matched.reverse();
            }
        }

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, User, UserId};
    use crate::request::{AirlockRequestInput, RequestStatus, RequestType};
    use crate::workspace::WorkspaceId;
    use uuid::Uuid;

    fn researcher() -> User {
        User {
            id: UserId::from(Uuid::new_v4()),
            name: "researcher".to_string(),
            email: None,
            roles: vec![Role::WorkspaceResearcher],
        }
    }

    fn sample_request(workspace_id: WorkspaceId, request_type: RequestType) -> AirlockRequest {
        AirlockRequest::draft(
            AirlockRequestInput {
                request_type,
                title: "dataset".to_string(),
                business_justification: "needed".to_string(),
            },
            &researcher(),
            workspace_id,
        )
    }

    #[tokio::test]
    async fn conditional_update_bumps_version() {
        let store = InMemoryRequestStore::new();
        let request = sample_request(WorkspaceId::from(Uuid::new_v4()), RequestType::Import);
        store.create(&request).await.unwrap();

        let mut updated = request.clone();
        updated.status = RequestStatus::Submitted;
        let stored = store.update(&updated, request.version).await.unwrap();
        assert_eq!(stored.version, request.version + 1);
        assert_eq!(store.get(request.id).await.unwrap().version, stored.version);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryRequestStore::new();
        let request = sample_request(WorkspaceId::from(Uuid::new_v4()), RequestType::Import);
        store.create(&request).await.unwrap();

        let mut first = request.clone();
        first.status_message = Some("first".to_string());
        store.update(&first, request.version).await.unwrap();

        let mut second = request.clone();
        second.status_message = Some("second".to_string());
        let err = store.update(&second, request.version).await.unwrap_err();
        assert!(matches!(err, AirlockError::VersionConflict(id) if id == request.id));

        // The first writer's value survives
        let current = store.get(request.id).await.unwrap();
        assert_eq!(current.status_message.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = InMemoryRequestStore::new();
        let workspace_id = WorkspaceId::from(Uuid::new_v4());

        let mut import = sample_request(workspace_id, RequestType::Import);
        import.status = RequestStatus::Submitted;
        let export = sample_request(workspace_id, RequestType::Export);
        let elsewhere = sample_request(WorkspaceId::from(Uuid::new_v4()), RequestType::Import);
        store.create(&import).await.unwrap();
        store.create(&export).await.unwrap();
        store.create(&elsewhere).await.unwrap();

        let all = store
            .list(RequestFilter::for_workspace(workspace_id))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let submitted = store
            .list(RequestFilter::for_workspace(workspace_id).with_status(RequestStatus::Submitted))
            .await
            .unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].id, import.id);

        let by_creator = store
            .list(RequestFilter::for_workspace(workspace_id).created_by(export.created_by.id))
            .await
            .unwrap();
        assert_eq!(by_creator.len(), 1);
        assert_eq!(by_creator[0].id, export.id);

        let newest_first = store
            .list(
                RequestFilter::for_workspace(workspace_id)
                    .ordered_by(OrderBy::CreatedAt, false),
            )
            .await
            .unwrap();
        assert!(newest_first[0].created_at >= newest_first[1].created_at);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = InMemoryRequestStore::new();
        let err = store
            .get(RequestId::from(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AirlockError::NotFound(_)));
    }
}
