//! Inputs command implementation
//!
//! Handles `eec inputs`: the topology inputs a client may set, as declared by
//! the artefact.

use std::path::Path;

use eec_config::Config;
use eec_utils::error::EecError;

use super::common::{build_supervisor, load_artefact};
use super::json_emit::print_json;

/// Execute the inputs command
pub fn execute_inputs_command(config: &Config, artefact: &Path, json: bool) -> Result<(), EecError> {
    let raw = load_artefact(artefact)?;
    let inputs = build_supervisor(config).inputs(&raw)?;
    if json {
        return print_json(&inputs);
    }
    if inputs.is_empty() {
        println!("The artefact declares no inputs");
        return Ok(());
    }
    for input in &inputs {
        let required = if input.required { "required" } else { "optional" };
        println!("{} ({}, {required})", input.key, input.kind);
        println!("  {}", input.description);
        if !input.default.as_str().is_some_and(str::is_empty) {
            println!("  default: {}", input.default);
        }
    }
    Ok(())
}
