//! Abort command implementation

use serde_json::json;

use eec_config::Config;
use eec_utils::error::EecError;

use super::common::build_supervisor;
use super::json_emit::print_json;

/// Execute the abort command. Only sets the flag; teardown happens in the
/// process driving the submission.
pub async fn execute_abort_command(config: &Config, id: &str, json: bool) -> Result<(), EecError> {
    let outcome = build_supervisor(config).abort(id).await?;
    if json {
        return print_json(&json!({
            "id": id,
            "outcome": outcome,
            "message": outcome.message(),
        }));
    }
    println!("{}", outcome.message());
    Ok(())
}
