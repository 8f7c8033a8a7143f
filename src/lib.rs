//! eec - execution environment controller
//!
//! eec accepts application topologies ("artefacts"), provisions orchestration
//! infrastructure for them, deploys the application and tracks status until an
//! operator requests removal. The core is the submission lifecycle: one
//! crash-tolerant worker per submission, coordinated only through durable
//! records, reconciled at startup and torn down exactly once.
//!
//! eec can be used in two ways:
//! - **CLI**: `eec serve`, `eec submit`, `eec status`, `eec abort`, ...
//! - **Library**: build a [`LifecycleSupervisor`] over your own
//!   [`RecordStore`], [`OrchestrationClient`] and [`ArtefactResolver`]
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use std::sync::Arc;
//! use eec::{LifecycleSupervisor, MemoryRecordStore, SimulatedOrchestrator, ToscaResolver};
//!
//! # async fn demo() -> Result<(), eec::EecError> {
//! let supervisor = LifecycleSupervisor::builder(
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(SimulatedOrchestrator::new("/tmp/eec-infra")),
//!     Arc::new(ToscaResolver::new("micado-master", "/etc/eec/master_spec.yaml")),
//! )
//! .build();
//! supervisor.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! - `eec-utils`: errors, exit codes, logging, paths, atomic writes
//! - `eec-config`: layered configuration discovery
//! - `eec-store`: [`RecordStore`] and its file and memory backends
//! - `eec-artefact`: [`ArtefactResolver`] and ADT handling
//! - `eec-orchestration`: [`OrchestrationClient`] and the simulated orchestrator
//! - `eec-lifecycle`: workers, recovery policy and the supervisor

pub mod cli;

pub use eec_artefact::{
    AdtInput, ArtefactResolver, DeploymentDescriptor, NodeSpec, RawArtefact, ResolvedArtefact,
    SubmissionInputs, ToscaResolver,
};
pub use eec_config::{CliOverrides, Config, LifecycleConfig, StoreBackend};
pub use eec_lifecycle::{
    AbortOutcome, LifecycleSettings, LifecycleSupervisor, ReconcileReport, StatusReport,
    UsageReport, WorkerExit,
};
pub use eec_orchestration::{AppId, InfraId, OrchestrationClient, SimulatedOrchestrator};
pub use eec_store::{
    FileRecordStore, MemoryRecordStore, RecordField, RecordStore, ServeLock, SubmissionRecord,
    SubmissionStatus,
};
pub use eec_utils::error::{
    ArtefactError, ConfigError, EecError, OrchestrationError, StoreError, UserFriendlyError,
};
pub use eec_utils::exit_codes::ExitCode;

#[doc(hidden)]
pub use eec_utils::{atomic_write, logging, paths};
