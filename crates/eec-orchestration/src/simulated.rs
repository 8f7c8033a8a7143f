//! Local orchestration binding.
//!
//! Infrastructure is simulated as one JSON document per identifier in a
//! directory, so provisioning, deployment and teardown can be exercised end
//! to end without a cloud, and attach works across restarts.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use eec_artefact::{DeploymentDescriptor, NodeSpec, Params};
use eec_utils::atomic_write::write_file_atomic;
use eec_utils::error::OrchestrationError;

use crate::client::{AppId, InfraId, OrchestrationClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeployedApp {
    app_id: AppId,
    deployed_at: DateTime<Utc>,
    descriptor: DeploymentDescriptor,
    params: Params,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InfraDocument {
    infra_id: InfraId,
    created_at: DateTime<Utc>,
    node_spec: NodeSpec,
    endpoint: String,
    applications: Vec<DeployedApp>,
}

/// File-backed stand-in for a real orchestrator.
#[derive(Debug, Clone)]
pub struct SimulatedOrchestrator {
    dir: PathBuf,
    // Serializes read-modify-write of documents within this process.
    guard: Arc<Mutex<()>>,
}

impl SimulatedOrchestrator {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            guard: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, infra_id: &InfraId) -> PathBuf {
        self.dir.join(format!("{}.json", infra_id.as_str()))
    }

    async fn load(&self, infra_id: &InfraId) -> Result<Option<InfraDocument>, OrchestrationError> {
        match tokio::fs::read(self.document_path(infra_id)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                OrchestrationError::Transport(format!("corrupt infrastructure document: {e}"))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OrchestrationError::Transport(e.to_string())),
        }
    }

    async fn save(&self, doc: &InfraDocument) -> Result<(), OrchestrationError> {
        let path = self.document_path(&doc.infra_id);
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| OrchestrationError::Transport(e.to_string()))?;
        tokio::task::spawn_blocking(move || write_file_atomic(&path, &bytes))
            .await
            .map_err(|e| OrchestrationError::Transport(e.to_string()))?
            .map_err(|e| OrchestrationError::Transport(e.to_string()))
    }

    async fn require(&self, infra_id: &InfraId) -> Result<InfraDocument, OrchestrationError> {
        self.load(infra_id)
            .await?
            .ok_or_else(|| OrchestrationError::InfrastructureNotFound {
                infra_id: infra_id.to_string(),
            })
    }
}

#[async_trait]
impl OrchestrationClient for SimulatedOrchestrator {
    async fn create_infrastructure(&self, spec: &NodeSpec) -> Result<InfraId, OrchestrationError> {
        let infra_id = InfraId::new(format!("infra-{}", uuid::Uuid::new_v4()));
        let doc = InfraDocument {
            endpoint: format!("https://{}.eec.local", infra_id.as_str()),
            infra_id: infra_id.clone(),
            created_at: Utc::now(),
            node_spec: spec.clone(),
            applications: Vec::new(),
        };

        let _guard = self.guard.lock().await;
        self.save(&doc)
            .await
            .map_err(|e| OrchestrationError::Provisioning(e.to_string()))?;
        tracing::info!(infra_id = %infra_id, "Simulated infrastructure created");
        Ok(infra_id)
    }

    async fn destroy_infrastructure(&self, infra_id: &InfraId) -> Result<(), OrchestrationError> {
        let _guard = self.guard.lock().await;
        match tokio::fs::remove_file(self.document_path(infra_id)).await {
            Ok(()) => {
                tracing::info!(infra_id = %infra_id, "Simulated infrastructure destroyed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(infra_id = %infra_id, "Infrastructure already gone");
                Ok(())
            }
            Err(e) => Err(OrchestrationError::Teardown(e.to_string())),
        }
    }

    async fn attach_infrastructure(&self, infra_id: &InfraId) -> Result<(), OrchestrationError> {
        self.require(infra_id).await.map(|_| ())
    }

    async fn deploy_application(
        &self,
        infra_id: &InfraId,
        descriptor: &DeploymentDescriptor,
        params: &Params,
        app_id: &str,
    ) -> Result<AppId, OrchestrationError> {
        let _guard = self.guard.lock().await;
        let mut doc = self.require(infra_id).await?;
        if doc.applications.iter().any(|app| app.app_id.as_str() == app_id) {
            return Err(OrchestrationError::Deployment(format!(
                "application {app_id} is already deployed"
            )));
        }

        let app = AppId::new(app_id);
        doc.applications.push(DeployedApp {
            app_id: app.clone(),
            deployed_at: Utc::now(),
            descriptor: descriptor.clone(),
            params: params.clone(),
        });
        self.save(&doc)
            .await
            .map_err(|e| OrchestrationError::Deployment(e.to_string()))?;
        Ok(app)
    }

    async fn list_applications(
        &self,
        infra_id: &InfraId,
    ) -> Result<Vec<AppId>, OrchestrationError> {
        let doc = self.require(infra_id).await?;
        Ok(doc.applications.into_iter().map(|app| app.app_id).collect())
    }

    async fn delete_application(
        &self,
        infra_id: &InfraId,
        app_id: &AppId,
    ) -> Result<(), OrchestrationError> {
        let _guard = self.guard.lock().await;
        let mut doc = self.require(infra_id).await?;
        doc.applications.retain(|app| &app.app_id != app_id);
        self.save(&doc).await
    }

    async fn infrastructure_details(&self, infra_id: &InfraId) -> Option<String> {
        let doc = self.load(infra_id).await.ok().flatten()?;
        Some(format!(
            "Endpoint: {}\nCreated: {}\nApplications: {}",
            doc.endpoint,
            doc.created_at.to_rfc3339(),
            doc.applications.len()
        ))
    }
}
