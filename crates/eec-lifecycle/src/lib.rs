//! Submission lifecycle for eec
//!
//! One [`LifecycleWorker`] per submission drives provisioning, deployment,
//! abort monitoring and teardown. Failures are handled by the step table in
//! [`recovery`]. The [`LifecycleSupervisor`] owns the workers, reconciles
//! durable records at startup and answers the request layer.
//!
//! All coordination goes through the injected [`eec_store::RecordStore`];
//! workers never talk to each other or to the supervisor's query path.

pub mod recovery;
pub mod status;
mod supervisor;
mod worker;

pub use recovery::{RECOVERY_POLICY, RecoveryAction, Step, recovery_for};
pub use status::{AbortOutcome, StatusReport, UsageReport, decode_details, render_details};
pub use supervisor::{LifecycleSupervisor, LifecycleSupervisorBuilder, ReconcileReport};
pub use worker::{Collaborators, Job, LifecycleSettings, LifecycleWorker, WorkerExit};
