//! Status command implementations
//!
//! Handles `eec status`, `eec usage` and `eec list`. All three read the record
//! store directly and never start a worker.

use eec_config::Config;
use eec_lifecycle::{StatusReport, decode_details};
use eec_utils::error::EecError;

use super::common::build_supervisor;
use super::json_emit::print_json;

/// Execute the status command
pub async fn execute_status_command(config: &Config, id: &str, json: bool) -> Result<(), EecError> {
    let report = build_supervisor(config).get_status(id).await?;
    if json {
        return print_json(&report);
    }

    println!("Submission: {}", report.id);
    println!("  Status: {}", report.status);
    println!("  Detail: {}", report.detail);
    if let Some(created) = report.created_at {
        println!("  Created: {}", created.to_rfc3339());
    }
    if report.abort_requested {
        println!("  Abort requested: yes");
    }
    if let Some(page) = report.details.as_deref().and_then(decode_details)
        && let Some(endpoint) = page.lines().find(|line| line.contains("Endpoint"))
    {
        println!("  {}", strip_tags(endpoint));
    }
    Ok(())
}

/// Execute the usage command
pub async fn execute_usage_command(config: &Config, id: &str, json: bool) -> Result<(), EecError> {
    let usage = build_supervisor(config).usage(id).await?;
    if json {
        return print_json(&usage);
    }
    println!("Submission: {id}");
    println!("  Runtime: {}s", usage.runtime_seconds);
    Ok(())
}

/// Execute the list command
pub async fn execute_list_command(config: &Config, json: bool) -> Result<(), EecError> {
    let reports = build_supervisor(config).list().await?;
    if json {
        return print_json(&reports);
    }
    if reports.is_empty() {
        println!("No submissions recorded");
        return Ok(());
    }
    for report in &reports {
        println!("{}", summary_line(report));
    }
    Ok(())
}

fn summary_line(report: &StatusReport) -> String {
    let abort = if report.abort_requested { " (abort requested)" } else { "" };
    format!("{:<36}  {:<8} {}{abort}", report.id, report.status.as_ref(), report.detail)
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}
