//! Logging and observability infrastructure for eec
//!
//! Structured logging via `tracing`. Every lifecycle worker runs inside a
//! `submission` span, and each lifecycle step reports start, completion and
//! failure through the helpers below so log lines carry the same fields.

use std::io::IsTerminal;

use tracing::{Level, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter. `json` switches the
/// output to one JSON object per line for log shippers.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("eec=debug,info")
            } else {
                EnvFilter::try_new("eec=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_ansi(use_color())
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_ansi(use_color())
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping everything a single lifecycle worker does.
pub fn submission_span(submission_id: &str) -> tracing::Span {
    span!(Level::INFO, "submission", submission_id = %submission_id)
}

pub fn log_step_start(submission_id: &str, step: &str) {
    info!(submission_id = %submission_id, step = %step, "Lifecycle step started");
}

pub fn log_step_complete(submission_id: &str, step: &str, duration_ms: u128) {
    info!(
        submission_id = %submission_id,
        step = %step,
        duration_ms = %duration_ms,
        "Lifecycle step completed"
    );
}

pub fn log_step_error(submission_id: &str, step: &str, error: &str, duration_ms: u128) {
    warn!(
        submission_id = %submission_id,
        step = %step,
        duration_ms = %duration_ms,
        error = %error,
        "Lifecycle step failed"
    );
}

/// Report infrastructure that could not be destroyed.
///
/// Emitted at `error` level with `alert = "resource_leak"` so operators can
/// route it to paging; a failed teardown is never only recorded in the store.
pub fn log_teardown_failure(submission_id: &str, infra_id: &str, error: &str) {
    error!(
        submission_id = %submission_id,
        infra_id = %infra_id,
        error = %error,
        alert = "resource_leak",
        "Infrastructure teardown failed; resources may still be running"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_do_not_panic_without_subscriber() {
        let span = submission_span("sub-1");
        let _entered = span.enter();
        log_step_start("sub-1", "create_infrastructure");
        log_step_complete("sub-1", "create_infrastructure", 12);
        log_step_error("sub-1", "deploy_application", "boom", 3);
        log_teardown_failure("sub-1", "infra-1", "api down");
    }
}
