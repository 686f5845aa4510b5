//! Allowed user actions for a request.
//!
//! Derived from the same transition table the lifecycle engine enforces
//! with, plus the role each action requires. The API layer guards its
//! endpoints with [`require_roles`], so the affordances computed here and
//! the enforcement applied there can never drift apart.

use serde::Serialize;

use crate::error::{AirlockError, Result};
use crate::identity::{Role, User};

use super::types::{AirlockRequest, RequestStatus};

/// Action a caller may take on a request next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AirlockAction {
    Review,
    Cancel,
    Submit,
}

impl AirlockAction {
    pub const ALL: [AirlockAction; 3] = [
        AirlockAction::Review,
        AirlockAction::Cancel,
        AirlockAction::Submit,
    ];

    /// Roles that may invoke this action.
    pub fn required_roles(self) -> &'static [Role] {
        match self {
            AirlockAction::Review => &[Role::AirlockManager],
            AirlockAction::Cancel | AirlockAction::Submit => {
                &[Role::WorkspaceOwner, Role::WorkspaceResearcher]
            }
        }
    }

    /// Status this action drives the request toward.
    pub fn target_status(self) -> RequestStatus {
        match self {
            AirlockAction::Review => RequestStatus::ApprovalInProgress,
            AirlockAction::Cancel => RequestStatus::Cancelled,
            AirlockAction::Submit => RequestStatus::Submitted,
        }
    }
}

/// Compute which actions `user` may invoke on `request` next.
///
/// Affordance only; the engine re-validates the transition and the API
/// layer re-checks the role on every invocation.
pub fn allowed_actions(request: &AirlockRequest, user: &User) -> Vec<AirlockAction> {
    AirlockAction::ALL
        .into_iter()
        .filter(|action| {
            request.status.can_transition_to(action.target_status())
                && user.has_any_role(action.required_roles())
        })
        .collect()
}

/// Endpoint guard: reject callers holding none of the action's roles.
pub fn require_roles(user: &User, action: AirlockAction) -> Result<()> {
    if user.has_any_role(action.required_roles()) {
        Ok(())
    } else {
        Err(AirlockError::Forbidden)
    }
}

/// A request paired with the actions the caller may take on it.
#[derive(Debug, Clone, Serialize)]
pub struct RequestWithActions {
    pub request: AirlockRequest,
    pub allowed_actions: Vec<AirlockAction>,
}
