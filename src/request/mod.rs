//! Airlock request domain model: documents, statuses, transitions, and the
//! allowed-actions resolver.

pub mod actions;
pub mod transitions;
pub mod types;

pub use actions::{AirlockAction, RequestWithActions, allowed_actions, require_roles};
pub use types::*;
