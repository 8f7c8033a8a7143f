use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use eec_artefact::{DeploymentDescriptor, NodeSpec, Params};
use eec_utils::error::OrchestrationError;

/// Opaque identifier of provisioned infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfraId(String);

impl InfraId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InfraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an application deployed on some infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client for the orchestration layer that creates infrastructure and runs
/// applications on it.
///
/// Every call may be slow. Callers must not hold locks across them, and no
/// timeout is imposed by callers; a binding that needs one enforces it itself.
///
/// Attaching to the same infrastructure from several processes must be
/// idempotent.
#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    /// Provision infrastructure described by `spec`.
    ///
    /// Fails with [`OrchestrationError::Provisioning`].
    async fn create_infrastructure(&self, spec: &NodeSpec) -> Result<InfraId, OrchestrationError>;

    /// Destroy infrastructure and everything on it.
    ///
    /// Fails with [`OrchestrationError::Teardown`].
    async fn destroy_infrastructure(&self, infra_id: &InfraId) -> Result<(), OrchestrationError>;

    /// Bind to infrastructure created earlier, possibly by another process.
    ///
    /// Fails with [`OrchestrationError::InfrastructureNotFound`] when the
    /// identifier is unknown.
    async fn attach_infrastructure(&self, infra_id: &InfraId) -> Result<(), OrchestrationError>;

    /// Deploy an application. Fails with [`OrchestrationError::Deployment`].
    async fn deploy_application(
        &self,
        infra_id: &InfraId,
        descriptor: &DeploymentDescriptor,
        params: &Params,
        app_id: &str,
    ) -> Result<AppId, OrchestrationError>;

    async fn list_applications(&self, infra_id: &InfraId)
    -> Result<Vec<AppId>, OrchestrationError>;

    async fn delete_application(
        &self,
        infra_id: &InfraId,
        app_id: &AppId,
    ) -> Result<(), OrchestrationError>;

    /// Free-text connection information, if the binding has any.
    async fn infrastructure_details(&self, infra_id: &InfraId) -> Option<String>;
}

/// Remove every application on `infra_id`, best-effort.
///
/// Failures are logged and skipped; destroying the infrastructure removes
/// leftovers anyway. Returns how many applications were removed.
pub async fn remove_applications(client: &dyn OrchestrationClient, infra_id: &InfraId) -> usize {
    let apps = match client.list_applications(infra_id).await {
        Ok(apps) => apps,
        Err(e) => {
            tracing::warn!(infra_id = %infra_id, error = %e, "Could not list applications");
            return 0;
        }
    };

    let mut removed = 0;
    for app in apps {
        match client.delete_application(infra_id, &app).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(
                    infra_id = %infra_id,
                    app_id = %app,
                    error = %e,
                    "Could not remove application"
                );
            }
        }
    }
    removed
}
