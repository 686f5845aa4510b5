//! Legal status transitions for airlock requests.
//!
//! The lifecycle is a small directed graph, not a total order:
//!
//! ```text
//! Draft ──submit──> Submitted ──scan──> InReview ──review──> ApprovalInProgress ──> Approved
//!   │                   │                  │      └─review──> RejectionInProgress ──> Rejected
//!   │                   │                  ├──────────────────> Blocked
//!   └───────────────────┴──────────────────┴──cancel─────────> Cancelled
//! ```
//!
//! The allow-list below is the single source of truth for every mutation
//! path: the lifecycle engine consults it before writing state, and the
//! allowed-actions resolver consults it to compute affordances. Any pair
//! absent from the list, including every self-transition, is illegal.

use super::types::RequestStatus;

impl RequestStatus {
    /// Whether a request in this status may move to `target`.
    ///
    /// Pure and total over the status cross-product.
    pub fn can_transition_to(self, target: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, target),
            (Draft, Submitted)
                | (Draft, Cancelled)
                | (Submitted, InReview)
                | (Submitted, Cancelled)
                | (InReview, ApprovalInProgress)
                | (InReview, RejectionInProgress)
                | (InReview, Cancelled)
                | (InReview, Blocked)
                | (ApprovalInProgress, Approved)
                | (RejectionInProgress, Rejected)
        )
    }

    /// A status with no outgoing edges in the transition table.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved
                | RequestStatus::Rejected
                | RequestStatus::Cancelled
                | RequestStatus::Blocked
        )
    }
}
