//! Caller identity, workspace roles, and the role-assignment directory.
//!
//! Role checks in this crate go through the [`Role`] enum rather than raw
//! strings so the resolver in [`crate::request::actions`] and the guards the
//! API layer applies compare the same named constants.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::workspace::Workspace;

/// Unique identifier for a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        UserId(uuid)
    }
}

impl std::ops::Deref for UserId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Workspace roles recognized by the airlock workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    WorkspaceOwner,
    WorkspaceResearcher,
    AirlockManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::WorkspaceOwner => "WorkspaceOwner",
            Role::WorkspaceResearcher => "WorkspaceResearcher",
            Role::AirlockManager => "AirlockManager",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "WorkspaceOwner" => Ok(Role::WorkspaceOwner),
            "WorkspaceResearcher" => Ok(Role::WorkspaceResearcher),
            "AirlockManager" => Ok(Role::AirlockManager),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// An authenticated caller together with the roles granted on the workspace
/// in scope. Auth token parsing happens upstream; the engine only ever sees
/// this resolved form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }
}

/// Identity snapshot embedded in persisted documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        UserRef {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Directory resolving which contact addresses hold each role on a
/// workspace. Backed by the platform's identity provider in production.
#[async_trait]
pub trait RoleAssignmentDirectory: Send + Sync {
    /// Contact addresses per role for the given workspace. Roles with no
    /// assignment may be absent from the map or mapped to an empty list.
    async fn workspace_role_contacts(
        &self,
        workspace: &Workspace,
    ) -> Result<HashMap<Role, Vec<String>>>;
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

/// Mock role directory for testing.
///
/// Returns a configurable role-to-contacts map without calling an identity
/// provider.
#[derive(Default)]
pub struct MockRoleDirectory {
    contacts: Mutex<HashMap<Role, Vec<String>>>,
}

impl MockRoleDirectory {
    /// Create a directory with no assignments at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a directory with one contact for every role.
    pub fn with_all_roles() -> Self {
        let directory = Self::default();
        directory.set_contacts(Role::WorkspaceOwner, vec!["owner@example.org".to_string()]);
        directory.set_contacts(
            Role::WorkspaceResearcher,
            vec!["researcher@example.org".to_string()],
        );
        directory.set_contacts(Role::AirlockManager, vec!["manager@example.org".to_string()]);
        directory
    }

    /// Replace the contacts for one role.
    pub fn set_contacts(&self, role: Role, contacts: Vec<String>) {
        self.contacts.lock().insert(role, contacts);
    }

    /// Remove a role from the map entirely.
    pub fn clear_role(&self, role: Role) {
        self.contacts.lock().remove(&role);
    }
}

#[async_trait]
impl RoleAssignmentDirectory for MockRoleDirectory {
    async fn workspace_role_contacts(
        &self,
        _workspace: &Workspace,
    ) -> Result<HashMap<Role, Vec<String>>> {
        Ok(self.contacts.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            Role::WorkspaceOwner,
            Role::WorkspaceResearcher,
            Role::AirlockManager,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("Gardener".parse::<Role>().is_err());
    }

    #[test]
    fn has_any_role_matches_any_granted_role() {
        let user = User {
            id: UserId::from(Uuid::new_v4()),
            name: "test".to_string(),
            email: None,
            roles: vec![Role::WorkspaceResearcher],
        };
        assert!(user.has_any_role(&[Role::WorkspaceOwner, Role::WorkspaceResearcher]));
        assert!(!user.has_any_role(&[Role::AirlockManager]));
    }
}
