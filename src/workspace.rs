//! Workspace model and airlock review configuration.
//!
//! Workspaces are deployed and mutated elsewhere; this crate only reads the
//! identity and the deployment property bag, which carries the airlock
//! enablement flag and the per-type review VM configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AirlockError, Result};
use crate::request::RequestType;

/// Unique identifier for a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub Uuid);

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for WorkspaceId {
    fn from(uuid: Uuid) -> Self {
        WorkspaceId(uuid)
    }
}

impl std::ops::Deref for WorkspaceId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Unique identifier for a workspace service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub Uuid);

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for ServiceId {
    fn from(uuid: Uuid) -> Self {
        ServiceId(uuid)
    }
}

/// Unique identifier for a user resource (e.g. a review VM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserResourceId(pub Uuid);

impl std::fmt::Display for UserResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for UserResourceId {
    fn from(uuid: Uuid) -> Self {
        UserResourceId(uuid)
    }
}

/// A deployed research workspace, as seen by the airlock engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub display_name: String,
    /// Free-form deployment properties produced by the workspace template.
    pub properties: Value,
}

/// Where a review VM for one request type must be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewVmTarget {
    pub workspace_id: WorkspaceId,
    pub workspace_service_id: ServiceId,
    pub template_name: String,
}

/// Shape of one `airlock_review_config` section in the property bag.
#[derive(Debug, Deserialize)]
struct ReviewConfigSection {
    #[serde(default)]
    workspace_id: Option<WorkspaceId>,
    workspace_service_id: ServiceId,
    user_resource_template_name: String,
}

impl Workspace {
    /// Airlock is on unless the workspace explicitly disables it.
    pub fn airlock_enabled(&self) -> bool {
        self.properties.get("enable_airlock") != Some(&Value::Bool(false))
    }

    /// Resolve where a review VM for the given request type is created.
    ///
    /// Imports are inspected in a dedicated review workspace named by the
    /// configuration; exports are inspected inside the workspace the data is
    /// leaving from, so the config section needs no workspace id there.
    pub fn review_vm_target(&self, request_type: RequestType) -> Result<ReviewVmTarget> {
        let key = match request_type {
            RequestType::Import => "import",
            RequestType::Export => "export",
        };
        let section = self
            .properties
            .get("airlock_review_config")
            .and_then(|config| config.get(key))
            .ok_or_else(|| configuration_error(self.id, key, "section is missing"))?;
        let section: ReviewConfigSection = serde_json::from_value(section.clone())
            .map_err(|e| configuration_error(self.id, key, &e.to_string()))?;

        let workspace_id = match request_type {
            RequestType::Import => section
                .workspace_id
                .ok_or_else(|| configuration_error(self.id, key, "workspace_id is missing"))?,
            RequestType::Export => self.id,
        };

        Ok(ReviewVmTarget {
            workspace_id,
            workspace_service_id: section.workspace_service_id,
            template_name: section.user_resource_template_name,
        })
    }
}

fn configuration_error(workspace_id: WorkspaceId, key: &str, detail: &str) -> AirlockError {
    AirlockError::Configuration(format!(
        "airlock_review_config.{} for workspace {} could not be read, \
         ask your platform administrator to check the workspace configuration ({})",
        key, workspace_id, detail
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace_with(properties: Value) -> Workspace {
        Workspace {
            id: WorkspaceId::from(Uuid::new_v4()),
            display_name: "test workspace".to_string(),
            properties,
        }
    }

    #[test]
    fn airlock_enabled_unless_explicitly_false() {
        assert!(workspace_with(json!({})).airlock_enabled());
        assert!(workspace_with(json!({"enable_airlock": true})).airlock_enabled());
        // Only a literal false disables the feature
        assert!(workspace_with(json!({"enable_airlock": null})).airlock_enabled());
        assert!(!workspace_with(json!({"enable_airlock": false})).airlock_enabled());
    }

    #[test]
    fn import_target_comes_from_config_workspace() {
        let review_workspace = Uuid::new_v4();
        let service = Uuid::new_v4();
        let workspace = workspace_with(json!({
            "airlock_review_config": {
                "import": {
                    "workspace_id": review_workspace,
                    "workspace_service_id": service,
                    "user_resource_template_name": "tre-review-vm",
                }
            }
        }));

        let target = workspace.review_vm_target(RequestType::Import).unwrap();
        assert_eq!(target.workspace_id, WorkspaceId::from(review_workspace));
        assert_eq!(target.workspace_service_id, ServiceId::from(service));
        assert_eq!(target.template_name, "tre-review-vm");
    }

    #[test]
    fn export_target_reuses_own_workspace() {
        let service = Uuid::new_v4();
        let workspace = workspace_with(json!({
            "airlock_review_config": {
                "export": {
                    "workspace_service_id": service,
                    "user_resource_template_name": "tre-review-vm",
                }
            }
        }));

        let target = workspace.review_vm_target(RequestType::Export).unwrap();
        assert_eq!(target.workspace_id, workspace.id);
    }

    #[test]
    fn missing_or_malformed_config_is_a_configuration_error() {
        let no_config = workspace_with(json!({}));
        assert!(matches!(
            no_config.review_vm_target(RequestType::Import),
            Err(AirlockError::Configuration(_))
        ));

        let missing_service = workspace_with(json!({
            "airlock_review_config": {
                "import": {"workspace_id": Uuid::new_v4()}
            }
        }));
        assert!(matches!(
            missing_service.review_vm_target(RequestType::Import),
            Err(AirlockError::Configuration(_))
        ));

        let import_without_workspace = workspace_with(json!({
            "airlock_review_config": {
                "import": {
                    "workspace_service_id": Uuid::new_v4(),
                    "user_resource_template_name": "tre-review-vm",
                }
            }
        }));
        assert!(matches!(
            import_without_workspace.review_vm_target(RequestType::Import),
            Err(AirlockError::Configuration(_))
        ));
    }
}
