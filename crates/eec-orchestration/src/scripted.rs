//! In-memory orchestration double with failure injection and call counting.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use eec_artefact::{DeploymentDescriptor, NodeSpec, Params};
use eec_utils::error::OrchestrationError;

use crate::client::{AppId, InfraId, OrchestrationClient};

/// Orchestrator operations that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Destroy,
    Attach,
    Deploy,
    ListApplications,
    DeleteApplication,
    Details,
}

#[derive(Debug, Default)]
struct State {
    infrastructures: BTreeMap<InfraId, Vec<AppId>>,
    failures: HashMap<Operation, OrchestrationError>,
    calls: HashMap<Operation, usize>,
    last_spec: Option<NodeSpec>,
    next_id: usize,
}

/// Scriptable [`OrchestrationClient`] for tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOrchestrator {
    state: Arc<Mutex<State>>,
    delay: Duration,
}

impl ScriptedOrchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to create and deploy calls.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every future call of `op` fail with `error`.
    pub fn fail_on(&self, op: Operation, error: OrchestrationError) {
        self.state().failures.insert(op, error);
    }

    pub fn clear_failure(&self, op: Operation) {
        self.state().failures.remove(&op);
    }

    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Register infrastructure as if created by an earlier process.
    pub fn insert_infrastructure(&self, infra_id: &InfraId) {
        self.state()
            .infrastructures
            .entry(infra_id.clone())
            .or_default();
    }

    /// Remove infrastructure out-of-band.
    pub fn forget_infrastructure(&self, infra_id: &InfraId) {
        self.state().infrastructures.remove(infra_id);
    }

    #[must_use]
    pub fn infrastructures(&self) -> Vec<InfraId> {
        self.state().infrastructures.keys().cloned().collect()
    }

    #[must_use]
    pub fn applications(&self, infra_id: &InfraId) -> Vec<AppId> {
        self.state()
            .infrastructures
            .get(infra_id)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last_spec(&self) -> Option<NodeSpec> {
        self.state().last_spec.clone()
    }

    /// Count the call and return the injected failure, if any.
    fn enter(&self, op: Operation) -> Result<(), OrchestrationError> {
        let mut state = self.state();
        *state.calls.entry(op).or_insert(0) += 1;
        match state.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl OrchestrationClient for ScriptedOrchestrator {
    async fn create_infrastructure(&self, spec: &NodeSpec) -> Result<InfraId, OrchestrationError> {
        self.pause().await;
        self.enter(Operation::Create)?;
        let mut state = self.state();
        state.next_id += 1;
        let infra_id = InfraId::new(format!("scripted-{}", state.next_id));
        state.infrastructures.insert(infra_id.clone(), Vec::new());
        state.last_spec = Some(spec.clone());
        Ok(infra_id)
    }

    async fn destroy_infrastructure(&self, infra_id: &InfraId) -> Result<(), OrchestrationError> {
        self.enter(Operation::Destroy)?;
        self.state().infrastructures.remove(infra_id);
        Ok(())
    }

    async fn attach_infrastructure(&self, infra_id: &InfraId) -> Result<(), OrchestrationError> {
        self.enter(Operation::Attach)?;
        if self.state().infrastructures.contains_key(infra_id) {
            Ok(())
        } else {
            Err(OrchestrationError::InfrastructureNotFound {
                infra_id: infra_id.to_string(),
            })
        }
    }

    async fn deploy_application(
        &self,
        infra_id: &InfraId,
        _descriptor: &DeploymentDescriptor,
        _params: &Params,
        app_id: &str,
    ) -> Result<AppId, OrchestrationError> {
        self.pause().await;
        self.enter(Operation::Deploy)?;
        let mut state = self.state();
        let apps = state.infrastructures.get_mut(infra_id).ok_or_else(|| {
            OrchestrationError::Deployment(format!("no infrastructure {infra_id}"))
        })?;
        let app = AppId::new(app_id);
        apps.push(app.clone());
        Ok(app)
    }

    async fn list_applications(
        &self,
        infra_id: &InfraId,
    ) -> Result<Vec<AppId>, OrchestrationError> {
        self.enter(Operation::ListApplications)?;
        Ok(self.applications(infra_id))
    }

    async fn delete_application(
        &self,
        infra_id: &InfraId,
        app_id: &AppId,
    ) -> Result<(), OrchestrationError> {
        self.enter(Operation::DeleteApplication)?;
        if let Some(apps) = self.state().infrastructures.get_mut(infra_id) {
            apps.retain(|app| app != app_id);
        }
        Ok(())
    }

    async fn infrastructure_details(&self, infra_id: &InfraId) -> Option<String> {
        self.enter(Operation::Details).ok()?;
        self.state()
            .infrastructures
            .contains_key(infra_id)
            .then(|| format!("Endpoint: scripted://{infra_id}"))
    }
}
