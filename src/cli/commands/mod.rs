//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs` and CLI tests.
//! Implementations live in `commands/*`.

mod abort;
mod common;
mod inputs;
mod json_emit;
mod serve;
mod status;
mod submit;

// Re-export command handlers
pub use abort::execute_abort_command;
pub use inputs::execute_inputs_command;
pub use serve::execute_serve_command;
pub use status::{execute_list_command, execute_status_command, execute_usage_command};
pub use submit::{SubmitRequest, execute_submit_command};

// Re-export JSON emit functions
pub use json_emit::emit_error_json;
