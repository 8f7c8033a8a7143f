//! Submit command implementation
//!
//! Handles `eec submit`. The submission's worker runs in this process, so the
//! command follows it: every status change is printed until the worker ends,
//! the submission settles (with `--detach`) or Ctrl-C is pressed. Leaving
//! early keeps the record for `eec serve` to reattach. The serve lock is held
//! throughout, so `eec serve` cannot run against the same store meanwhile.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use eec_config::Config;
use eec_lifecycle::{LifecycleSupervisor, StatusReport};
use eec_store::SubmissionStatus;
use eec_utils::error::EecError;

use super::common::{acquire_store_lock, build_supervisor, load_artefact, load_inputs};
use super::json_emit::print_json;

const FOLLOW_INTERVAL: Duration = Duration::from_millis(200);

/// Arguments of `eec submit`
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub artefact: PathBuf,
    pub inputs: Option<PathBuf>,
    pub id: Option<String>,
    pub detach: bool,
}

/// Execute the submit command
pub async fn execute_submit_command(
    config: &Config,
    request: SubmitRequest,
    json: bool,
) -> Result<(), EecError> {
    let artefact = load_artefact(&request.artefact)?;
    let inputs = load_inputs(request.inputs.as_deref())?;

    // Held until the supervisor has shut down.
    let lock = acquire_store_lock(config, false)?;
    let supervisor = build_supervisor(config);
    let id = match request.id {
        Some(id) => {
            supervisor.resubmit(&id, artefact, inputs).await?;
            id
        }
        None => supervisor.submit(artefact, inputs).await?,
    };
    if !json {
        println!("Submitted: {id}");
    }

    let followed = follow(&supervisor, &id, request.detach, json).await;
    let last = match followed {
        Ok(last) => last,
        Err(e) => {
            supervisor.shutdown().await;
            drop(lock);
            return Err(e);
        }
    };

    // A finished worker reports its own failure, e.g. a teardown that failed.
    let finished = !supervisor.active().contains(&id);
    let exit = if finished {
        supervisor.wait(&id).await.transpose()?
    } else {
        None
    };
    supervisor.shutdown().await;
    drop(lock);

    if json {
        return print_json(&json!({
            "id": id,
            "status": last.as_ref().map(|report| report.status),
            "detail": last.as_ref().map(|report| report.detail.as_str()),
            "workerExit": exit.map(|exit| format!("{exit:?}")),
        }));
    }
    match (&last, exit) {
        (Some(report), _) if !finished => println!(
            "Left {id} in {} ({}); run `eec serve` to keep supervising it",
            report.status, report.detail
        ),
        (_, Some(exit)) => println!("Worker for {id} finished: {exit:?}"),
        _ => {}
    }
    Ok(())
}

/// Print status changes until the worker ends, the submission settles when
/// `detach` is set, or the user interrupts. Returns the last status seen.
async fn follow(
    supervisor: &LifecycleSupervisor,
    id: &str,
    detach: bool,
    json: bool,
) -> Result<Option<StatusReport>, EecError> {
    let mut last: Option<StatusReport> = None;
    loop {
        match supervisor.get_status(id).await {
            Ok(report) => {
                let changed = last
                    .as_ref()
                    .is_none_or(|prev| (prev.status, &prev.detail) != (report.status, &report.detail));
                if changed && !json {
                    println!("  [{}] {}", report.status, report.detail);
                }
                let settled = report.status != SubmissionStatus::Init;
                last = Some(report);
                if detach && settled {
                    return Ok(last);
                }
            }
            Err(e) if e.is_not_found() => last = None,
            Err(e) => return Err(e),
        }

        if !supervisor.active().iter().any(|active| active == id) {
            return Ok(last);
        }

        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                info!(submission_id = %id, "Interrupted; leaving submission for reattach");
                return Ok(last);
            }
            () = tokio::time::sleep(FOLLOW_INTERVAL) => {}
        }
    }
}
