//! Common helper functions used across CLI commands
//!
//! Builds the collaborators the CLI injects into the supervisor and reads
//! artefact and input files.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use eec_artefact::{RawArtefact, SubmissionInputs, ToscaResolver};
use eec_config::{Config, StoreBackend};
use eec_lifecycle::{LifecycleSettings, LifecycleSupervisor};
use eec_orchestration::SimulatedOrchestrator;
use eec_store::{FileRecordStore, MemoryRecordStore, RecordStore, ServeLock};
use eec_utils::error::{ArtefactError, EecError};
use eec_utils::paths::infrastructure_dir;

/// Open the configured record store.
#[must_use]
pub fn open_store(config: &Config) -> Arc<dyn RecordStore> {
    match config.store.backend {
        StoreBackend::File => Arc::new(FileRecordStore::new(config.store.path.clone())),
        StoreBackend::Memory => Arc::new(MemoryRecordStore::new()),
    }
}

/// Take the serve lock on the configured store root. Any command that runs
/// workers holds it until its supervisor has shut down.
pub fn acquire_store_lock(config: &Config, force: bool) -> Result<ServeLock, EecError> {
    let lock = ServeLock::acquire(config.store.path.as_std_path(), force)?;
    info!(
        path = %lock.path().display(),
        pid = lock.info().pid,
        "Serve lock acquired"
    );
    Ok(lock)
}

/// Supervisor over the configured store, the simulated orchestrator in
/// `<EEC_HOME>/infrastructure` and the TOSCA resolver.
#[must_use]
pub fn build_supervisor(config: &Config) -> LifecycleSupervisor {
    let store = open_store(config);
    let client = Arc::new(SimulatedOrchestrator::new(infrastructure_dir()));
    let resolver = Arc::new(ToscaResolver::from_config(&config.infrastructure));
    LifecycleSupervisor::builder(store, client, resolver)
        .settings(LifecycleSettings::from(&config.lifecycle))
        .build()
}

/// Read an artefact JSON file.
pub fn load_artefact(path: &Path) -> Result<RawArtefact, EecError> {
    let bytes = std::fs::read(path)?;
    let artefact = serde_json::from_slice(&bytes).map_err(|e| ArtefactError::Decode {
        reason: format!("{} is not an artefact document: {e}", path.display()),
    })?;
    Ok(artefact)
}

/// Read a submission inputs JSON file; no file means no inputs.
pub fn load_inputs(path: Option<&Path>) -> Result<SubmissionInputs, EecError> {
    let Some(path) = path else {
        return Ok(SubmissionInputs::default());
    };
    let bytes = std::fs::read(path)?;
    let inputs = serde_json::from_slice(&bytes).map_err(|e| ArtefactError::InvalidField {
        field: "parameters".to_string(),
        reason: format!("{}: {e}", path.display()),
    })?;
    Ok(inputs)
}
