//! Per-submission lifecycle worker.
//!
//! ```text
//! INIT ──resolve/create/deploy──▶ RUNNING ──abort──▶ ABORTED ──▶ STOPPED
//!   │                                                  ▲
//!   └──step failed──▶ ERROR ────────abort──────────────┘
//! ```
//!
//! A worker either provisions a fresh submission or attaches to
//! infrastructure recorded by an earlier worker. Both paths end in the
//! monitoring loop, the only place an abort request is observed.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use eec_artefact::{ArtefactResolver, RawArtefact, SubmissionInputs};
use eec_config::LifecycleConfig;
use eec_orchestration::{InfraId, OrchestrationClient, remove_applications};
use eec_store::{RecordField, RecordStore, SubmissionStatus};
use eec_utils::error::EecError;
use eec_utils::logging;

use crate::recovery::{Recovered, RecoveryAction, Step, StepOutcome, recovery_for};
use crate::status::{
    APP_DEPLOYING, APP_READY, APP_REMOVING, ATTACHED, INFRA_BUILDING, INFRA_INITIALIZING,
    INFRA_READY, INFRA_REMOVE_FAILED, INFRA_REMOVED, INFRA_REMOVING, render_details,
};

/// Timing of lifecycle workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Wait between abort polls
    pub poll_interval: Duration,
    /// Retention of records that failed before or while provisioning
    pub failed_record_ttl: Duration,
    /// How long a STOPPED record stays queryable; zero deletes it at once
    pub stopped_retention: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from(&LifecycleConfig::default())
    }
}

impl From<&LifecycleConfig> for LifecycleSettings {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            failed_record_ttl: config.failed_record_ttl,
            stopped_retention: config.stopped_retention,
        }
    }
}

/// Collaborators injected into the supervisor and every worker.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub client: Arc<dyn OrchestrationClient>,
    pub resolver: Arc<dyn ArtefactResolver>,
}

/// What a worker was started to do.
#[derive(Debug, Clone)]
pub enum Job {
    /// Resolve, provision and deploy a new submission
    Provision {
        artefact: RawArtefact,
        inputs: SubmissionInputs,
    },
    /// Bind to the infrastructure already recorded for the submission
    Attach,
}

/// How a worker ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Teardown completed
    Stopped,
    /// The record expired or was deleted
    Vanished,
    /// Attach found the infrastructure gone; the record was deleted
    Discarded,
    /// Supervisor shutdown; the record is left for a later attach
    Cancelled,
}

enum Flow {
    Monitor(Option<InfraId>),
    Exit(WorkerExit),
}

/// Drives one submission through its lifecycle.
///
/// The worker is the only writer of its record's fields, apart from the
/// `abort` flag.
pub struct LifecycleWorker {
    id: String,
    job: Job,
    deps: Collaborators,
    settings: LifecycleSettings,
    cancel: CancellationToken,
}

impl LifecycleWorker {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        job: Job,
        deps: Collaborators,
        settings: LifecycleSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: id.into(),
            job,
            deps,
            settings,
            cancel,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run to completion inside the submission's span.
    ///
    /// Step failures are recorded in the store and do not end the worker with
    /// an error. Only a failed teardown, a failed attach, or a store failure
    /// does.
    pub async fn run(self) -> Result<WorkerExit, EecError> {
        let span = logging::submission_span(&self.id);
        async move {
            info!("Lifecycle worker started");
            let result = self.drive().await;
            match &result {
                Ok(exit) => info!(exit = ?exit, "Lifecycle worker finished"),
                Err(e) => warn!(error = %e, "Lifecycle worker failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(&self) -> Result<WorkerExit, EecError> {
        let flow = match &self.job {
            Job::Provision { artefact, inputs } => self.provision(artefact, inputs).await?,
            Job::Attach => self.attach().await?,
        };
        match flow {
            Flow::Exit(exit) => Ok(exit),
            Flow::Monitor(infra) => self.monitor(infra).await,
        }
    }

    async fn provision(
        &self,
        artefact: &RawArtefact,
        inputs: &SubmissionInputs,
    ) -> Result<Flow, EecError> {
        self.publish(SubmissionStatus::Init, INFRA_INITIALIZING, None)
            .await?;

        let resolve = async {
            self.deps
                .resolver
                .resolve(artefact, inputs)
                .map_err(EecError::from)
        };
        let resolved = match self.execute_step(Step::ResolveArtefact, None, resolve).await? {
            StepOutcome::Done(resolved) => resolved,
            StepOutcome::Failed(_) => return Ok(Flow::Monitor(None)),
        };

        self.publish(SubmissionStatus::Init, INFRA_BUILDING, None)
            .await?;
        let create = async {
            self.deps
                .client
                .create_infrastructure(&resolved.node_spec)
                .await
                .map_err(EecError::from)
        };
        let infra = match self
            .execute_step(Step::CreateInfrastructure, None, create)
            .await?
        {
            StepOutcome::Done(infra) => infra,
            StepOutcome::Failed(_) => return Ok(Flow::Monitor(None)),
        };

        if let Err(e) = self
            .deps
            .store
            .set(&self.id, RecordField::InfraId, infra.as_str())
            .await
        {
            logging::log_teardown_failure(&self.id, infra.as_str(), &e.to_string());
            return Err(e.into());
        }
        self.publish(SubmissionStatus::Init, INFRA_READY, Some(&infra))
            .await?;

        self.publish(SubmissionStatus::Init, APP_DEPLOYING, Some(&infra))
            .await?;
        let app_id = resolved.app_id.clone().unwrap_or_else(|| self.id.clone());
        let deploy = async {
            self.deps
                .client
                .deploy_application(&infra, &resolved.descriptor, &resolved.params, &app_id)
                .await
                .map_err(EecError::from)
        };
        match self
            .execute_step(Step::DeployApplication, Some(&infra), deploy)
            .await?
        {
            StepOutcome::Done(app) => debug!(app_id = %app, "Application deployed"),
            StepOutcome::Failed(Recovered::NeedsTeardown { detail }) => {
                self.forced_teardown(&infra, &detail).await?;
                return Ok(Flow::Monitor(None));
            }
            StepOutcome::Failed(_) => return Ok(Flow::Monitor(Some(infra))),
        }

        self.publish(SubmissionStatus::Running, APP_READY, Some(&infra))
            .await?;
        Ok(Flow::Monitor(Some(infra)))
    }

    async fn attach(&self) -> Result<Flow, EecError> {
        let Some(record) = self.deps.store.get(&self.id).await? else {
            return Ok(Flow::Exit(WorkerExit::Vanished));
        };
        let Some(infra) = record.infra_id.clone().map(InfraId::new) else {
            return Ok(Flow::Monitor(None));
        };

        if record.abort_requested {
            info!(infra_id = %infra, "Abort was requested before restart; resuming teardown");
            return Ok(Flow::Monitor(Some(infra)));
        }

        let attach = async {
            self.deps
                .client
                .attach_infrastructure(&infra)
                .await
                .map_err(EecError::from)
        };
        // Only an unknown infrastructure is recovered, by discarding the record.
        if let StepOutcome::Failed(_) = self
            .execute_step(Step::AttachInfrastructure, Some(&infra), attach)
            .await?
        {
            return Ok(Flow::Exit(WorkerExit::Discarded));
        }

        if record.status == SubmissionStatus::Error {
            info!(infra_id = %infra, "Attached to infrastructure of a failed submission");
        } else {
            self.publish(SubmissionStatus::Running, ATTACHED, Some(&infra))
                .await?;
        }
        Ok(Flow::Monitor(Some(infra)))
    }

    /// Poll the abort flag until it is set, the record disappears or the
    /// supervisor shuts down. The first check happens immediately.
    async fn monitor(&self, infra: Option<InfraId>) -> Result<WorkerExit, EecError> {
        loop {
            match self.deps.store.get(&self.id).await {
                Ok(None) => {
                    info!("Record no longer exists");
                    return Ok(WorkerExit::Vanished);
                }
                Ok(Some(record)) if record.abort_requested => return self.teardown(infra).await,
                Ok(Some(_)) => {}
                Err(e) => warn!(error = %e, "Abort poll failed; retrying next interval"),
            }

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    info!("Shutdown requested; record left for reattach");
                    return Ok(WorkerExit::Cancelled);
                }
                () = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }

    /// Abort teardown: ABORTED while removing, then STOPPED.
    async fn teardown(&self, infra: Option<InfraId>) -> Result<WorkerExit, EecError> {
        info!("Abort requested; tearing down");

        match &infra {
            Some(infra) => {
                self.publish(SubmissionStatus::Aborted, APP_REMOVING, Some(infra))
                    .await?;
                let removed = remove_applications(self.deps.client.as_ref(), infra).await;
                debug!(removed, "Applications removed");

                self.publish(SubmissionStatus::Aborted, INFRA_REMOVING, Some(infra))
                    .await?;
                self.destroy(infra).await?;
                self.deps.store.clear(&self.id, RecordField::InfraId).await?;
            }
            None => {
                self.publish(SubmissionStatus::Aborted, INFRA_REMOVING, None)
                    .await?;
            }
        }

        self.publish(SubmissionStatus::Stopped, INFRA_REMOVED, None)
            .await?;
        if self.settings.stopped_retention.is_zero() {
            self.deps.store.delete(&self.id).await?;
        } else {
            self.deps
                .store
                .expire(&self.id, self.settings.stopped_retention)
                .await?;
        }
        Ok(WorkerExit::Stopped)
    }

    /// Teardown after a failed deployment. The deployment error stays the
    /// status detail.
    async fn forced_teardown(&self, infra: &InfraId, detail: &str) -> Result<(), EecError> {
        remove_applications(self.deps.client.as_ref(), infra).await;
        self.destroy(infra).await?;

        self.deps.store.clear(&self.id, RecordField::InfraId).await?;
        self.publish(SubmissionStatus::Error, detail, None).await?;
        self.deps
            .store
            .expire(&self.id, self.settings.failed_record_ttl)
            .await?;
        Ok(())
    }

    async fn destroy(&self, infra: &InfraId) -> Result<(), EecError> {
        let destroy = async {
            self.deps
                .client
                .destroy_infrastructure(infra)
                .await
                .map_err(EecError::from)
        };
        // A failed destroy is always escalated as an error.
        self.execute_step(Step::DestroyInfrastructure, Some(infra), destroy)
            .await
            .map(drop)
    }

    /// Run one step, applying its recovery action from the policy table on
    /// failure.
    async fn execute_step<T, F>(
        &self,
        step: Step,
        infra: Option<&InfraId>,
        op: F,
    ) -> Result<StepOutcome<T>, EecError>
    where
        F: Future<Output = Result<T, EecError>>,
    {
        let step_name = step.to_string();
        logging::log_step_start(&self.id, &step_name);
        let started = Instant::now();

        match op.await {
            Ok(value) => {
                logging::log_step_complete(&self.id, &step_name, started.elapsed().as_millis());
                Ok(StepOutcome::Done(value))
            }
            Err(error) => {
                logging::log_step_error(
                    &self.id,
                    &step_name,
                    &error.to_string(),
                    started.elapsed().as_millis(),
                );
                self.recover(step, infra, error)
                    .await
                    .map(StepOutcome::Failed)
            }
        }
    }

    async fn recover(
        &self,
        step: Step,
        infra: Option<&InfraId>,
        error: EecError,
    ) -> Result<Recovered, EecError> {
        let detail = failure_detail(&error);

        match recovery_for(step) {
            RecoveryAction::RecordErrorAndExpire => {
                self.publish(SubmissionStatus::Error, &detail, None).await?;
                self.deps
                    .store
                    .expire(&self.id, self.settings.failed_record_ttl)
                    .await?;
                Ok(Recovered::Errored)
            }
            RecoveryAction::RecordErrorThenTeardown => {
                self.publish(SubmissionStatus::Error, &detail, infra).await?;
                match infra {
                    Some(_) => Ok(Recovered::NeedsTeardown { detail }),
                    None => Ok(Recovered::Errored),
                }
            }
            RecoveryAction::DiscardIfUnknown => {
                if let EecError::Orchestration(e) = &error
                    && e.is_unknown_infrastructure()
                {
                    warn!(
                        infra_id = infra.map(InfraId::as_str),
                        "Infrastructure unknown to the orchestrator; discarding record"
                    );
                    self.deps.store.delete(&self.id).await?;
                    return Ok(Recovered::Discarded);
                }
                self.publish(SubmissionStatus::Error, &detail, None).await?;
                Err(error)
            }
            RecoveryAction::EscalateTeardownFailure => {
                logging::log_teardown_failure(
                    &self.id,
                    infra.map_or("", InfraId::as_str),
                    &error.to_string(),
                );
                if let Err(e) = self
                    .publish(SubmissionStatus::Error, INFRA_REMOVE_FAILED, None)
                    .await
                {
                    warn!(error = %e, "Could not record teardown failure");
                }
                Err(error)
            }
        }
    }

    /// Write status, detail and the rendered details page together.
    async fn publish(
        &self,
        status: SubmissionStatus,
        detail: &str,
        infra: Option<&InfraId>,
    ) -> Result<(), EecError> {
        let connection = match infra {
            Some(infra) => self.deps.client.infrastructure_details(infra).await,
            None => None,
        };
        let details = render_details(status, detail, connection.as_deref());

        self.deps
            .store
            .set_fields(
                &self.id,
                &[
                    (RecordField::Status, status.as_ref()),
                    (RecordField::StatusDetail, detail),
                    (RecordField::Details, &details),
                ],
            )
            .await?;
        debug!(status = %status, detail, "Status published");
        Ok(())
    }
}

/// Status detail for a failed step: the collaborator's own message, which
/// names the missing field for malformed artefacts.
fn failure_detail(error: &EecError) -> String {
    match error {
        EecError::Artefact(e) => e.to_string(),
        EecError::Orchestration(e) => e.to_string(),
        other => other.to_string(),
    }
}
