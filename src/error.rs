//! Error types for the airlock request engine.

use thiserror::Error;

use crate::identity::Role;
use crate::request::{RequestId, RequestStatus};

/// Result type alias using the airlock error type.
pub type Result<T> = std::result::Result<T, AirlockError>;

/// Main error type for the airlock request engine.
///
/// Store and bus failures deliberately carry no detail in their display
/// text; the underlying cause is logged where the failure is observed.
#[derive(Error, Debug)]
pub enum AirlockError {
    /// The workspace has airlock turned off
    #[error("Airlock is not enabled in this workspace")]
    AirlockNotEnabled,

    /// Malformed input (e.g. empty title, missing justification)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required role has no notification contact registered
    #[error("No notification contact is registered for the '{0}' role")]
    MissingNotificationContact(Role),

    /// The state store failed to respond or rejected the operation
    #[error("State store unavailable")]
    StoreUnavailable,

    /// Publishing the creation events failed; the request was removed again
    #[error("Event publisher unavailable, the request was not created")]
    NotificationUnavailable,

    /// Publishing the update events failed; the stored update is kept
    #[error(
        "Event publisher unavailable, the request was updated but stakeholders were not notified"
    )]
    NotificationUpdateUnavailable,

    /// The requested status change is not in the legal transition set
    #[error("Status change from '{from}' to '{to}' is not allowed")]
    IllegalStatusChange {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// A conditional write lost against a concurrent writer
    #[error("Request {0} was modified by another caller, re-read and retry")]
    VersionConflict(RequestId),

    /// Request is in an invalid status for the requested operation
    #[error("Invalid state: request {0} is in status '{1}', expected '{2}'")]
    InvalidState(RequestId, String, String),

    /// Review VM configuration is absent or malformed
    #[error("Review configuration error: {0}")]
    Configuration(String),

    /// Request not found
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    /// Caller does not hold a role permitted to perform the action
    #[error("Caller is not permitted to perform this action")]
    Forbidden,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AirlockError {
    /// Stable externally visible status code for each error kind.
    ///
    /// The routing layer maps engine failures through this so API behavior
    /// stays consistent regardless of which operation raised the error.
    pub fn status_code(&self) -> u16 {
        match self {
            AirlockError::AirlockNotEnabled => 405,
            AirlockError::Validation(_) => 400,
            AirlockError::MissingNotificationContact(_) => 417,
            AirlockError::StoreUnavailable
            | AirlockError::NotificationUnavailable
            | AirlockError::NotificationUpdateUnavailable => 503,
            AirlockError::IllegalStatusChange { .. } => 400,
            AirlockError::VersionConflict(_) => 409,
            AirlockError::InvalidState(..) => 400,
            AirlockError::Configuration(_) => 422,
            AirlockError::NotFound(_) => 404,
            AirlockError::Forbidden => 403,
            AirlockError::Serialization(_) | AirlockError::Other(_) => 500,
        }
    }

    /// True for failures worth retrying after a re-read (conflict) or a
    /// backoff (store/bus outage).
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AirlockError::VersionConflict(_)
                | AirlockError::StoreUnavailable
                | AirlockError::NotificationUnavailable
                | AirlockError::NotificationUpdateUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_bus_errors_do_not_leak_internals() {
        let errors = [
            AirlockError::StoreUnavailable,
            AirlockError::NotificationUnavailable,
            AirlockError::NotificationUpdateUnavailable,
        ];
        for e in errors {
            let text = e.to_string().to_lowercase();
            assert!(!text.contains("cosmos"));
            assert!(!text.contains("sql"));
            assert!(!text.contains("grid"));
            assert_eq!(e.status_code(), 503);
        }
    }

    #[test]
    fn conflict_maps_to_409() {
        let e = AirlockError::VersionConflict(RequestId::from(uuid::Uuid::new_v4()));
        assert_eq!(e.status_code(), 409);
        assert!(e.is_retriable());
    }
}
