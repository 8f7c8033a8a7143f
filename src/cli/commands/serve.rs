//! Serve command implementation
//!
//! Handles `eec serve`: one supervisor per record store, guarded by the serve
//! lock, running until Ctrl-C.

use tracing::info;

use eec_config::Config;
use eec_utils::error::EecError;

use super::common::{acquire_store_lock, build_supervisor};

/// Execute the serve command
pub async fn execute_serve_command(config: &Config, force: bool) -> Result<(), EecError> {
    let lock = acquire_store_lock(config, force)?;

    let supervisor = build_supervisor(config);
    let report = supervisor.start().await?;
    println!(
        "Serving {}: resumed {} submission(s), discarded {}",
        config.store.path,
        report.resumed.len(),
        report.discarded.len()
    );
    for id in &report.resumed {
        println!("  resumed   {id}");
    }
    for id in &report.discarded {
        println!("  discarded {id}");
    }

    let interrupted = tokio::signal::ctrl_c().await;
    info!("Stopping supervisor");
    supervisor.shutdown().await;
    drop(lock);
    interrupted?;
    Ok(())
}
