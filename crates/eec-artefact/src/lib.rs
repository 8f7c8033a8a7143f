//! Artefact resolution.
//!
//! A submission carries a raw artefact (an ADT as base64 YAML, an inline ADT,
//! or a reference to a CSAR bundle) plus input parameters. [`ArtefactResolver`]
//! turns these into the [`DeploymentDescriptor`] and [`NodeSpec`] the
//! orchestrator consumes.

mod resolver;
mod types;

pub use resolver::{
    APP_ID_PARAM, ArtefactResolver, SUPPORTED_TOSCA_VERSIONS, ToscaResolver, adt_inputs,
    csar_inputs, validate_adt,
};
pub use types::{
    AdtInput, DeploymentDescriptor, NodeSpec, Params, RawArtefact, ResolvedArtefact,
    SubmissionInputs,
};
