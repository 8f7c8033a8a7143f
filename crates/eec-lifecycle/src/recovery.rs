//! Error-recovery policy for lifecycle steps.
//!
//! Every step the worker runs maps to exactly one [`RecoveryAction`] in
//! [`RECOVERY_POLICY`]. The worker applies it through a single
//! execute-with-recovery helper, so what happens on failure is decided here
//! and nowhere else.

use strum::{Display, EnumIter};

/// A lifecycle step that calls out to a collaborator and may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    ResolveArtefact,
    CreateInfrastructure,
    DeployApplication,
    AttachInfrastructure,
    DestroyInfrastructure,
}

/// What the worker does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Record ERROR with the failure as detail and shorten the record's
    /// retention. Nothing exists that needs cleaning up.
    RecordErrorAndExpire,
    /// Record ERROR with the failure as detail, then force teardown of the
    /// infrastructure. The detail survives the teardown.
    RecordErrorThenTeardown,
    /// Delete the record when the infrastructure is unknown; otherwise record
    /// ERROR and propagate.
    DiscardIfUnknown,
    /// Record ERROR with the teardown-failed detail, raise an operator alert
    /// and propagate. Fatal to the worker.
    EscalateTeardownFailure,
}

/// Step to recovery action table.
pub const RECOVERY_POLICY: &[(Step, RecoveryAction)] = &[
    (Step::ResolveArtefact, RecoveryAction::RecordErrorAndExpire),
    (Step::CreateInfrastructure, RecoveryAction::RecordErrorAndExpire),
    (Step::DeployApplication, RecoveryAction::RecordErrorThenTeardown),
    (Step::AttachInfrastructure, RecoveryAction::DiscardIfUnknown),
    (Step::DestroyInfrastructure, RecoveryAction::EscalateTeardownFailure),
];

/// Look up the recovery action for `step`.
#[must_use]
pub fn recovery_for(step: Step) -> RecoveryAction {
    RECOVERY_POLICY
        .iter()
        .find(|(s, _)| *s == step)
        .map_or(RecoveryAction::EscalateTeardownFailure, |(_, action)| *action)
}

/// How a failed step was resolved, when it did not propagate an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recovered {
    /// ERROR is recorded; the worker keeps the record abortable
    Errored,
    /// The record was deleted
    Discarded,
    /// ERROR is recorded and the infrastructure must be torn down
    NeedsTeardown { detail: String },
}

/// Result of running one step through the policy.
#[derive(Debug)]
pub(crate) enum StepOutcome<T> {
    Done(T),
    Failed(Recovered),
}
