//! Supervisor owning the lifecycle workers of one process.
//!
//! The supervisor is the request layer's entry point. It writes new records,
//! sets the abort flag and answers queries straight from the record store.
//! Everything else about a submission happens in its worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use eec_artefact::{AdtInput, ArtefactResolver, RawArtefact, SubmissionInputs};
use eec_orchestration::OrchestrationClient;
use eec_store::{RecordField, RecordStore, SubmissionRecord, SubmissionStatus, encode_time};
use eec_utils::error::EecError;

use crate::status::{
    AbortOutcome, INFRA_INITIALIZING, StatusReport, UsageReport, render_details,
};
use crate::worker::{Collaborators, Job, LifecycleSettings, LifecycleWorker, WorkerExit};

type WorkerHandle = JoinHandle<Result<WorkerExit, EecError>>;

/// Decisions taken by startup reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records with infrastructure; a worker was started on the attach path
    pub resumed: Vec<String>,
    /// Records without infrastructure; deleted
    pub discarded: Vec<String>,
}

/// Builder for [`LifecycleSupervisor`].
pub struct LifecycleSupervisorBuilder {
    deps: Collaborators,
    settings: LifecycleSettings,
}

impl LifecycleSupervisorBuilder {
    #[must_use]
    pub fn settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn build(self) -> LifecycleSupervisor {
        LifecycleSupervisor {
            deps: self.deps,
            settings: self.settings,
            workers: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            reconciled: AtomicBool::new(false),
        }
    }
}

/// Owns one worker per active submission.
///
/// Connect once, reconcile once, then serve: call [`start`](Self::start)
/// before accepting requests, and [`shutdown`](Self::shutdown) on exit.
pub struct LifecycleSupervisor {
    deps: Collaborators,
    settings: LifecycleSettings,
    workers: Mutex<HashMap<String, WorkerHandle>>,
    cancel: CancellationToken,
    reconciled: AtomicBool,
}

impl LifecycleSupervisor {
    #[must_use]
    pub fn builder(
        store: Arc<dyn RecordStore>,
        client: Arc<dyn OrchestrationClient>,
        resolver: Arc<dyn ArtefactResolver>,
    ) -> LifecycleSupervisorBuilder {
        LifecycleSupervisorBuilder {
            deps: Collaborators {
                store,
                client,
                resolver,
            },
            settings: LifecycleSettings::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Check the store is reachable, then reconcile.
    pub async fn start(&self) -> Result<ReconcileReport, EecError> {
        self.deps.store.ping().await?;
        self.reconcile().await
    }

    /// Resume or discard every record left by an earlier process.
    ///
    /// Runs at most once per supervisor. Records with `infra_id` get an
    /// attach worker; records without one are deleted.
    pub async fn reconcile(&self) -> Result<ReconcileReport, EecError> {
        if self.reconciled.swap(true, Ordering::SeqCst) {
            return Err(EecError::AlreadyReconciled);
        }

        let mut report = ReconcileReport::default();
        for id in self.deps.store.list_ids().await? {
            if self.is_active(&id) {
                debug!(submission_id = %id, "Record already has a worker; skipping");
                continue;
            }
            let has_infra = self
                .deps
                .store
                .exists(&id, RecordField::InfraId)
                .await?;
            if has_infra {
                info!(submission_id = %id, "Resuming submission via attach");
                self.spawn(&id, Job::Attach);
                report.resumed.push(id);
            } else {
                info!(submission_id = %id, "Discarding record without infrastructure");
                self.deps.store.delete(&id).await?;
                report.discarded.push(id);
            }
        }

        info!(
            resumed = report.resumed.len(),
            discarded = report.discarded.len(),
            "Reconciliation complete"
        );
        Ok(report)
    }

    /// Accept a new submission and start its worker.
    ///
    /// Returns as soon as the record exists; provisioning happens in the
    /// background. Only the artefact envelope is checked here. Topology
    /// problems surface as an ERROR status naming the field.
    pub async fn submit(
        &self,
        artefact: RawArtefact,
        inputs: SubmissionInputs,
    ) -> Result<String, EecError> {
        self.deps.resolver.check(&artefact)?;

        let id = Uuid::new_v4().to_string();
        self.write_initial_record(&id, true).await?;
        info!(submission_id = %id, "Submission accepted");
        self.spawn(&id, Job::Provision { artefact, inputs });
        Ok(id)
    }

    /// Submit under a caller-chosen id.
    ///
    /// A record with `infra_id` takes the attach path and the artefact is
    /// ignored. A record without it is provisioned again: `submit_time` is
    /// kept and any expiry left by an earlier failure is cancelled, since the
    /// record is about to own infrastructure again.
    pub async fn resubmit(
        &self,
        id: &str,
        artefact: RawArtefact,
        inputs: SubmissionInputs,
    ) -> Result<(), EecError> {
        if self.is_active(id) {
            return Err(EecError::WorkerActive { id: id.to_string() });
        }

        match self.deps.store.get(id).await? {
            Some(record) if record.infra_id.is_some() => {
                info!(submission_id = %id, "Resubmission attaches to recorded infrastructure");
                self.spawn(id, Job::Attach);
            }
            existing => {
                self.deps.resolver.check(&artefact)?;
                self.write_initial_record(id, existing.is_none()).await?;
                info!(submission_id = %id, "Resubmission accepted");
                self.spawn(id, Job::Provision { artefact, inputs });
            }
        }
        Ok(())
    }

    async fn write_initial_record(&self, id: &str, stamp: bool) -> Result<(), EecError> {
        let status = SubmissionStatus::Init;
        let submit_time = encode_time(Utc::now());
        let details = render_details(status, INFRA_INITIALIZING, None);
        let mut fields = vec![
            (RecordField::Status, status.as_ref()),
            (RecordField::StatusDetail, INFRA_INITIALIZING),
            (RecordField::Details, details.as_str()),
        ];
        if stamp {
            fields.push((RecordField::SubmitTime, submit_time.as_str()));
        }
        self.deps.store.set_fields(id, &fields).await?;
        if !stamp {
            self.deps.store.persist(id).await?;
        }
        Ok(())
    }

    async fn record(&self, id: &str) -> Result<SubmissionRecord, EecError> {
        self.deps
            .store
            .get(id)
            .await?
            .ok_or_else(|| EecError::SubmissionNotFound { id: id.to_string() })
    }

    /// Last durable status of a submission.
    pub async fn get_status(&self, id: &str) -> Result<StatusReport, EecError> {
        self.record(id).await.map(StatusReport::from)
    }

    /// Wall-clock runtime since the submission was accepted.
    pub async fn usage(&self, id: &str) -> Result<UsageReport, EecError> {
        let record = self.record(id).await?;
        let runtime_seconds = record
            .submit_time
            .map_or(0, |submitted| (Utc::now() - submitted).num_seconds().max(0));
        Ok(UsageReport { runtime_seconds })
    }

    /// Request teardown. Only sets the flag; the worker observes it at its
    /// next poll.
    pub async fn abort(&self, id: &str) -> Result<AbortOutcome, EecError> {
        let record = self.record(id).await?;
        if record.abort_requested {
            debug!(submission_id = %id, "Abort already requested");
            return Ok(AbortOutcome::AlreadyRequested);
        }
        // The record may be removed after the read; never bring it back.
        let flagged = self
            .deps
            .store
            .update(id, RecordField::Abort, eec_store::encode_flag(true))
            .await?;
        if !flagged {
            return Err(EecError::SubmissionNotFound { id: id.to_string() });
        }
        info!(submission_id = %id, "Abort requested");
        Ok(AbortOutcome::Initiated)
    }

    /// Status of every live record, ordered by id.
    pub async fn list(&self) -> Result<Vec<StatusReport>, EecError> {
        let mut reports = Vec::new();
        for id in self.deps.store.list_ids().await? {
            if let Some(record) = self.deps.store.get(&id).await? {
                reports.push(StatusReport::from(record));
            }
        }
        Ok(reports)
    }

    /// Topology inputs a client may set for `artefact`.
    pub fn inputs(&self, artefact: &RawArtefact) -> Result<Vec<AdtInput>, EecError> {
        Ok(self.deps.resolver.inputs(artefact)?)
    }

    /// Ids of submissions whose worker is still running, sorted.
    #[must_use]
    pub fn active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .workers()
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn is_active(&self, id: &str) -> bool {
        self.workers()
            .get(id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Await the worker of `id`. `None` when no worker was started for it.
    pub async fn wait(&self, id: &str) -> Option<Result<WorkerExit, EecError>> {
        let handle = self.workers().remove(id)?;
        Some(join(id, handle).await)
    }

    /// Stop every poll loop and await all workers.
    ///
    /// Records are left as they are, so a restarted supervisor reattaches.
    /// Workers blocked in an orchestrator call finish that call first.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<(String, WorkerHandle)> = self.workers().drain().collect();
        info!(workers = handles.len(), "Shutting down lifecycle workers");
        for (id, handle) in handles {
            if let Err(e) = join(&id, handle).await {
                warn!(submission_id = %id, error = %e, "Worker ended with error");
            }
        }
    }

    fn spawn(&self, id: &str, job: Job) {
        let worker = LifecycleWorker::new(
            id,
            job,
            self.deps.clone(),
            self.settings.clone(),
            self.cancel.child_token(),
        );
        let handle = tokio::spawn(worker.run());
        if let Some(previous) = self.workers().insert(id.to_string(), handle) {
            debug_assert!(previous.is_finished());
        }
    }

    fn workers(&self) -> MutexGuard<'_, HashMap<String, WorkerHandle>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn join(id: &str, handle: WorkerHandle) -> Result<WorkerExit, EecError> {
    handle.await.unwrap_or_else(|e| {
        Err(EecError::Io(std::io::Error::other(format!(
            "worker for {id} did not complete: {e}"
        ))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use eec_artefact::ToscaResolver;
    use eec_orchestration::{InfraId, Operation, ScriptedOrchestrator};
    use async_trait::async_trait;
    use eec_store::MemoryRecordStore;
    use eec_utils::error::{OrchestrationError, StoreError};

    const VALID_ADT: &str = r"
tosca_definitions_version: tosca_simple_yaml_1_2
imports:
  - https://example.org/tosca/types.yaml
topology_template:
  inputs:
    replicas:
      type: integer
      default: 1
  node_templates:
    micado-master:
      properties:
        instance_type: m1.medium
    web:
      type: tosca.nodes.Container
";

    const MISSING_TOPOLOGY: &str = r"
tosca_definitions_version: tosca_simple_yaml_1_2
imports:
  - https://example.org/tosca/types.yaml
";

    struct Harness {
        store: Arc<MemoryRecordStore>,
        orchestrator: ScriptedOrchestrator,
        supervisor: LifecycleSupervisor,
    }

    fn settings() -> LifecycleSettings {
        LifecycleSettings {
            poll_interval: Duration::from_millis(10),
            failed_record_ttl: Duration::from_secs(60),
            stopped_retention: Duration::from_millis(50),
        }
    }

    fn harness_with(store: Arc<MemoryRecordStore>, orchestrator: ScriptedOrchestrator) -> Harness {
        let resolver = ToscaResolver::new("micado-master", "/nonexistent/master_spec.yaml");
        let supervisor = LifecycleSupervisor::builder(
            store.clone(),
            Arc::new(orchestrator.clone()),
            Arc::new(resolver),
        )
        .settings(settings())
        .build();
        Harness {
            store,
            orchestrator,
            supervisor,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MemoryRecordStore::new()), ScriptedOrchestrator::new())
    }

    fn artefact(adt: &str) -> RawArtefact {
        RawArtefact {
            download_url: Some("https://example.org/app.yaml".to_string()),
            content: Some(STANDARD.encode(adt)),
            inline_adt: None,
        }
    }

    async fn wait_for(h: &Harness, id: &str, done: impl Fn(&StatusReport) -> bool) -> StatusReport {
        for _ in 0..2000 {
            if let Ok(report) = h.supervisor.get_status(id).await
                && done(&report)
            {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("{id} never reached the expected state");
    }

    async fn wait_for_status(h: &Harness, id: &str, status: SubmissionStatus) -> StatusReport {
        wait_for(h, id, |report| report.status == status).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_before_provisioning() {
        let orchestrator = ScriptedOrchestrator::new().with_delay(Duration::from_secs(5));
        let h = harness_with(Arc::new(MemoryRecordStore::new()), orchestrator);

        let id = h
            .supervisor
            .submit(artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        let report = h.supervisor.get_status(&id).await.unwrap();
        assert_eq!(report.status, SubmissionStatus::Init);
        assert!(report.created_at.is_some());

        wait_for_status(&h, &id, SubmissionStatus::Running).await;
        assert_eq!(h.orchestrator.calls(Operation::Create), 1);
        h.supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_rejects_undecodable_content() {
        let h = harness();
        let raw = RawArtefact {
            content: Some("%%% not base64 %%%".to_string()),
            ..RawArtefact::default()
        };
        let err = h
            .supervisor
            .submit(raw, SubmissionInputs::default())
            .await
            .unwrap_err();
        assert!(err.is_malformed_input());
        assert!(h.store.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_topology_names_section() {
        let h = harness();
        let id = h
            .supervisor
            .submit(artefact(MISSING_TOPOLOGY), SubmissionInputs::default())
            .await
            .unwrap();

        let report = wait_for_status(&h, &id, SubmissionStatus::Error).await;
        assert!(report.detail.contains("topology_template"), "{}", report.detail);
        assert_eq!(h.orchestrator.calls(Operation::Create), 0);
        assert!(h.store.time_to_live(&id).await.is_some());
        h.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_never_destroys() {
        let h = harness();
        h.orchestrator.fail_on(
            Operation::Create,
            OrchestrationError::Provisioning("quota exceeded".to_string()),
        );

        let id = h
            .supervisor
            .submit(artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        let report = wait_for_status(&h, &id, SubmissionStatus::Error).await;

        assert!(report.detail.contains("quota exceeded"));
        assert_eq!(h.orchestrator.calls(Operation::Destroy), 0);
        let record = h.store.get(&id).await.unwrap().unwrap();
        assert!(record.infra_id.is_none());
        h.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deploy_failure_destroys_once_and_keeps_detail() {
        let h = harness();
        h.orchestrator.fail_on(
            Operation::Deploy,
            OrchestrationError::Deployment("image pull failed".to_string()),
        );

        let id = h
            .supervisor
            .submit(artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&h, &id, SubmissionStatus::Error).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(h.orchestrator.calls(Operation::Destroy), 1);
        assert!(h.orchestrator.infrastructures().is_empty());
        let record = h.store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, SubmissionStatus::Error);
        assert!(record.status_detail.contains("image pull failed"));
        assert!(record.infra_id.is_none());
        h.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_is_idempotent() {
        let h = harness();
        let id = h
            .supervisor
            .submit(artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&h, &id, SubmissionStatus::Running).await;

        assert_eq!(h.supervisor.abort(&id).await.unwrap(), AbortOutcome::Initiated);
        assert_eq!(
            h.supervisor.abort(&id).await.unwrap(),
            AbortOutcome::AlreadyRequested
        );

        let exit = h.supervisor.wait(&id).await.unwrap().unwrap();
        assert_eq!(exit, WorkerExit::Stopped);
        assert_eq!(h.orchestrator.calls(Operation::Destroy), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_from_error_reaches_stopped() {
        let h = harness();
        let id = h
            .supervisor
            .submit(artefact(MISSING_TOPOLOGY), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&h, &id, SubmissionStatus::Error).await;

        h.supervisor.abort(&id).await.unwrap();
        assert_eq!(
            h.supervisor.wait(&id).await.unwrap().unwrap(),
            WorkerExit::Stopped
        );
        assert_eq!(h.orchestrator.calls(Operation::Destroy), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let h = harness();
        assert!(h.supervisor.get_status("nope").await.unwrap_err().is_not_found());
        assert!(h.supervisor.abort("nope").await.unwrap_err().is_not_found());
        assert!(h.supervisor.usage("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_resumes_and_discards() {
        let store = Arc::new(MemoryRecordStore::new());
        let orchestrator = ScriptedOrchestrator::new();
        let infra = InfraId::new("scripted-existing");
        orchestrator.insert_infrastructure(&infra);

        store
            .set_fields(
                "live",
                &[
                    (RecordField::Status, "RUNNING"),
                    (RecordField::InfraId, infra.as_str()),
                ],
            )
            .await
            .unwrap();
        store
            .set("orphan", RecordField::Status, "INIT")
            .await
            .unwrap();

        let h = harness_with(store, orchestrator);
        let report = h.supervisor.start().await.unwrap();
        assert_eq!(report.resumed, vec!["live".to_string()]);
        assert_eq!(report.discarded, vec!["orphan".to_string()]);
        assert!(h.store.get("orphan").await.unwrap().is_none());

        let status = wait_for(&h, "live", |r| r.detail == crate::status::ATTACHED).await;
        assert_eq!(status.status, SubmissionStatus::Running);
        assert_eq!(h.orchestrator.calls(Operation::Create), 0);
        assert_eq!(h.orchestrator.calls(Operation::Attach), 1);
        assert_eq!(h.supervisor.active(), vec!["live".to_string()]);

        assert!(matches!(
            h.supervisor.reconcile().await,
            Err(EecError::AlreadyReconciled)
        ));
        h.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_to_vanished_infrastructure_discards_record() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .set_fields(
                "stale",
                &[
                    (RecordField::Status, "RUNNING"),
                    (RecordField::InfraId, "scripted-gone"),
                ],
            )
            .await
            .unwrap();

        let h = harness_with(store, ScriptedOrchestrator::new());
        h.supervisor.start().await.unwrap();

        let exit = h.supervisor.wait("stale").await.unwrap().unwrap();
        assert_eq!(exit, WorkerExit::Discarded);
        assert!(h.store.get("stale").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_rejects_live_worker_and_keeps_submit_time() {
        let h = harness();
        h.supervisor
            .resubmit("fixed-id", artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&h, "fixed-id", SubmissionStatus::Running).await;
        let first = h.store.get("fixed-id").await.unwrap().unwrap().submit_time;

        let err = h
            .supervisor
            .resubmit("fixed-id", artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EecError::WorkerActive { .. }));

        h.supervisor.shutdown().await;
        assert!(h.supervisor.active().is_empty());

        let restarted = harness_with(h.store.clone(), h.orchestrator.clone());
        restarted
            .supervisor
            .resubmit("fixed-id", artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for(&restarted, "fixed-id", |r| r.detail == crate::status::ATTACHED).await;
        let record = restarted.store.get("fixed-id").await.unwrap().unwrap();
        assert_eq!(record.submit_time, first);
        assert_eq!(restarted.orchestrator.calls(Operation::Create), 1);
        restarted.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_after_failure_cancels_expiry() {
        let h = harness();
        h.supervisor
            .resubmit("again", artefact(MISSING_TOPOLOGY), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&h, "again", SubmissionStatus::Error).await;
        assert!(h.store.time_to_live("again").await.is_some());
        h.supervisor.shutdown().await;

        let restarted = harness_with(h.store.clone(), h.orchestrator.clone());
        restarted
            .supervisor
            .resubmit("again", artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&restarted, "again", SubmissionStatus::Running).await;
        assert!(restarted.store.time_to_live("again").await.is_none());

        tokio::time::sleep(Duration::from_secs(120)).await;
        let record = restarted.store.get("again").await.unwrap().unwrap();
        assert_eq!(record.status, SubmissionStatus::Running);
        assert_eq!(restarted.orchestrator.infrastructures().len(), 1);
        restarted.supervisor.shutdown().await;
    }

    /// Store whose records disappear right after they are read.
    #[derive(Default)]
    struct VanishingStore {
        inner: MemoryRecordStore,
    }

    #[async_trait]
    impl RecordStore for VanishingStore {
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }

        async fn get(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError> {
            let record = self.inner.get(id).await?;
            self.inner.delete(id).await?;
            Ok(record)
        }

        async fn get_field(
            &self,
            id: &str,
            field: RecordField,
        ) -> Result<Option<String>, StoreError> {
            self.inner.get_field(id, field).await
        }

        async fn set(&self, id: &str, field: RecordField, value: &str) -> Result<(), StoreError> {
            self.inner.set(id, field, value).await
        }

        async fn update(
            &self,
            id: &str,
            field: RecordField,
            value: &str,
        ) -> Result<bool, StoreError> {
            self.inner.update(id, field, value).await
        }

        async fn clear(&self, id: &str, field: RecordField) -> Result<(), StoreError> {
            self.inner.clear(id, field).await
        }

        async fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }

        async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
            self.inner.list_ids().await
        }

        async fn exists(&self, id: &str, field: RecordField) -> Result<bool, StoreError> {
            self.inner.exists(id, field).await
        }

        async fn expire(&self, id: &str, ttl: Duration) -> Result<bool, StoreError> {
            self.inner.expire(id, ttl).await
        }

        async fn persist(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.persist(id).await
        }
    }

    #[tokio::test]
    async fn test_abort_never_recreates_removed_record() {
        let store = Arc::new(VanishingStore::default());
        store
            .inner
            .set("gone", RecordField::Status, "STOPPED")
            .await
            .unwrap();
        let supervisor = LifecycleSupervisor::builder(
            store.clone(),
            Arc::new(ScriptedOrchestrator::new()),
            Arc::new(ToscaResolver::new("micado-master", "/nonexistent/master_spec.yaml")),
        )
        .settings(settings())
        .build();

        let err = supervisor.abort("gone").await.unwrap_err();
        assert!(matches!(err, EecError::SubmissionNotFound { .. }));
        assert!(store.inner.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_records_intact() {
        let h = harness();
        let id = h
            .supervisor
            .submit(artefact(VALID_ADT), SubmissionInputs::default())
            .await
            .unwrap();
        wait_for_status(&h, &id, SubmissionStatus::Running).await;

        h.supervisor.shutdown().await;
        let record = h.store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, SubmissionStatus::Running);
        assert!(record.infra_id.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_usage_counts_from_submit_time() {
        let h = harness();
        let submitted = Utc::now() - chrono::Duration::seconds(120);
        h.store
            .set("old", RecordField::SubmitTime, &encode_time(submitted))
            .await
            .unwrap();

        let usage = h.supervisor.usage("old").await.unwrap();
        assert!(usage.runtime_seconds >= 120);
    }
}
