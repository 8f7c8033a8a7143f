//! JSON emit functions for CLI output
//!
//! Every command prints one pretty-printed JSON document on stdout when
//! `--json` is given. Errors go to stdout as well so scripts parse one stream.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use eec_utils::error::EecError;
use eec_utils::exit_codes::ExitCode;

/// Serialize a command result for `--json` output.
pub fn emit_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON output")
}

/// Print `value` as JSON, mapping serialization failures into [`EecError`].
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), EecError> {
    let text = emit_json(value).map_err(|e| EecError::Io(std::io::Error::other(format!("{e:#}"))))?;
    println!("{text}");
    Ok(())
}

/// Print an error as `{"error": <kind>, "exitCode": <n>, "message": <text>}`.
pub fn emit_error_json(err: &EecError, code: ExitCode) {
    let body = json!({
        "error": code.kind(),
        "exitCode": code.as_i32(),
        "message": err.to_string(),
    });
    match emit_json(&body) {
        Ok(text) => println!("{text}"),
        Err(_) => eprintln!("{err}"),
    }
}
