//! Orchestration client contract and bindings.
//!
//! The lifecycle only talks to the orchestration layer through
//! [`OrchestrationClient`]. [`SimulatedOrchestrator`] is a local binding for
//! running eec without a cloud; with the `test-utils` feature,
//! [`ScriptedOrchestrator`] offers failure injection for tests.

mod client;
#[cfg(any(test, feature = "test-utils"))]
mod scripted;
mod simulated;

pub use client::{AppId, InfraId, OrchestrationClient, remove_applications};
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::{Operation, ScriptedOrchestrator};
pub use simulated::SimulatedOrchestrator;
