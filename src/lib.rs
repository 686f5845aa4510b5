//! Airlock request lifecycle engine for managed research workspaces.
//!
//! Data entering or leaving a research workspace travels through an
//! "airlock": a governed request that is drafted, submitted, manually
//! reviewed (optionally on a transient inspection VM), and finally approved
//! or rejected. This crate implements the request lifecycle state machine,
//! the persistence and notification consistency contract around it, and the
//! review VM coordination.
//!
//! The document store, event bus, role directory, and resource deployment
//! orchestrator are external collaborators behind async traits; recording
//! in-memory implementations are provided for tests and local development.

pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod request;
pub mod review;
pub mod store;
pub mod workspace;

// Re-export commonly used types
pub use engine::{LifecycleEngine, RequestUpdate};
pub use error::{AirlockError, Result};
pub use events::{
    EventPublisher, MockEventPublisher, NotificationEvent, PublishedEvent, StatusChangedEvent,
};
pub use identity::{MockRoleDirectory, Role, RoleAssignmentDirectory, User, UserId, UserRef};
pub use request::*;
pub use review::{
    MockOrchestrator, Operation, OperationAction, OperationId, OperationStatus,
    ResourceOrchestrator, ReviewVmCoordinator, ReviewVmSpec,
};
pub use store::memory::InMemoryRequestStore;
pub use store::{OrderBy, RequestFilter, RequestStore};
pub use workspace::{ReviewVmTarget, ServiceId, UserResourceId, Workspace, WorkspaceId};
