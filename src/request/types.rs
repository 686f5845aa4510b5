//! Core types for airlock requests.
//!
//! An [`AirlockRequest`] is a persisted document with a small set of
//! immutable identity fields and a mutable tail (status, files, reviews,
//! review VM references) guarded by a monotonically increasing version
//! token. Status mutation never happens by assigning the field directly in
//! application code; every path goes through the lifecycle engine, which
//! consults the transition table in [`super::transitions`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AirlockError, Result};
use crate::identity::{User, UserRef};
use crate::workspace::{ServiceId, UserResourceId, WorkspaceId};

/// Unique identifier for an airlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        RequestId(uuid)
    }
}

impl std::ops::Deref for RequestId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Unique identifier for a recorded review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub Uuid);

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for ReviewId {
    fn from(uuid: Uuid) -> Self {
        ReviewId(uuid)
    }
}

/// Direction of the data movement a request governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Import,
    Export,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Import => "import",
            RequestType::Export => "export",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an airlock request.
///
/// The legal edges between statuses live in [`super::transitions`]; this
/// enum is just the value set. Serialized values match the wire format the
/// platform's other components already consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    InReview,
    ApprovalInProgress,
    Approved,
    RejectionInProgress,
    Rejected,
    Cancelled,
    Blocked,
}

impl RequestStatus {
    /// Every status, in lifecycle order. Used for exhaustive checks.
    pub const ALL: [RequestStatus; 9] = [
        RequestStatus::Draft,
        RequestStatus::Submitted,
        RequestStatus::InReview,
        RequestStatus::ApprovalInProgress,
        RequestStatus::Approved,
        RequestStatus::RejectionInProgress,
        RequestStatus::Rejected,
        RequestStatus::Cancelled,
        RequestStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Submitted => "submitted",
            RequestStatus::InReview => "in_review",
            RequestStatus::ApprovalInProgress => "approval_in_progress",
            RequestStatus::Approved => "approved",
            RequestStatus::RejectionInProgress => "rejection_in_progress",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RequestStatus::Draft),
            "submitted" => Ok(RequestStatus::Submitted),
            "in_review" => Ok(RequestStatus::InReview),
            "approval_in_progress" => Ok(RequestStatus::ApprovalInProgress),
            "approved" => Ok(RequestStatus::Approved),
            "rejection_in_progress" => Ok(RequestStatus::RejectionInProgress),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" => Ok(RequestStatus::Cancelled),
            "blocked" => Ok(RequestStatus::Blocked),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

/// A file attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlockFile {
    pub name: String,
    pub size: u64,
}

/// A reviewer's decision on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded review decision. Appended to the request's review history and
/// never mutated or removed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlockReview {
    pub id: ReviewId,
    pub decision: ReviewDecision,
    pub decision_explanation: String,
    pub reviewer: UserRef,
    pub created_at: DateTime<Utc>,
}

/// Reference to a transient review VM created for manual inspection.
///
/// The resource itself is owned by the deployment orchestrator; the request
/// only carries the coordinates needed to tear it down later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVmRef {
    pub workspace_id: WorkspaceId,
    pub workspace_service_id: ServiceId,
    pub user_resource_id: UserResourceId,
}

/// User-supplied fields for creating a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlockRequestInput {
    pub request_type: RequestType,
    pub title: String,
    pub business_justification: String,
}

impl AirlockRequestInput {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AirlockError::Validation("title must not be empty".to_string()));
        }
        if self.business_justification.trim().is_empty() {
            return Err(AirlockError::Validation(
                "business justification must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// User-supplied fields for recording a review decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlockReviewInput {
    pub decision: ReviewDecision,
    pub decision_explanation: String,
}

impl AirlockReviewInput {
    pub fn validate(&self) -> Result<()> {
        if self.decision_explanation.trim().is_empty() {
            return Err(AirlockError::Validation(
                "decision explanation must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A governed data import/export request attached to a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlockRequest {
    pub id: RequestId,
    pub workspace_id: WorkspaceId,
    pub request_type: RequestType,
    pub title: String,
    pub business_justification: String,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub files: Vec<AirlockFile>,
    pub status_message: Option<String>,
    pub reviews: Vec<AirlockReview>,
    pub review_vms: Vec<ReviewVmRef>,
    pub updated_by: UserRef,
    pub updated_at: DateTime<Utc>,
    /// Concurrency token; a conditional write must present the stored value.
    pub version: u64,
}

impl AirlockRequest {
    /// Construct a new draft owned by `created_by`.
    pub fn draft(input: AirlockRequestInput, created_by: &User, workspace_id: WorkspaceId) -> Self {
        let now = Utc::now();
        let creator = UserRef::from(created_by);
        AirlockRequest {
            id: RequestId::from(Uuid::new_v4()),
            workspace_id,
            request_type: input.request_type,
            title: input.title,
            business_justification: input.business_justification,
            created_by: creator.clone(),
            created_at: now,
            status: RequestStatus::Draft,
            files: Vec::new(),
            status_message: None,
            reviews: Vec::new(),
            review_vms: Vec::new(),
            updated_by: creator,
            updated_at: now,
            version: 0,
        }
    }

    /// Check if this request can no longer change status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
