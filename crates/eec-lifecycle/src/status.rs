//! Status details and the payloads answered to the request layer.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eec_store::{SubmissionRecord, SubmissionStatus};

pub const INFRA_INITIALIZING: &str = "infrastructure initializing";
pub const INFRA_BUILDING: &str = "infrastructure building";
pub const INFRA_READY: &str = "infrastructure ready";
pub const APP_DEPLOYING: &str = "application is being deployed on the infrastructure";
pub const APP_READY: &str = "application is ready";
pub const ATTACHED: &str = "attached to existing infrastructure";
pub const APP_REMOVING: &str = "application is being removed";
pub const INFRA_REMOVING: &str = "infrastructure is being removed";
pub const INFRA_REMOVED: &str = "infrastructure removed";
pub const INFRA_REMOVE_FAILED: &str = "failed to remove infrastructure";

/// Render the human-readable status page stored in a record's `details`
/// field, base64-encoded.
#[must_use]
pub fn render_details(status: SubmissionStatus, detail: &str, connection: Option<&str>) -> String {
    let connection = connection.map_or_else(
        || "<p>No infrastructure is currently allocated.</p>".to_string(),
        |info| format!("<pre>{}</pre>", escape_html(info)),
    );
    let page = format!(
        "<html>\n\
         <head><title>Execution status report</title></head>\n\
         <body>\n\
         <h1>Overview</h1>\n\
         <p>State: <b>{status}</b></p>\n\
         <p>Status of the deployment: <b>{}</b></p>\n\
         <h1>Infrastructure</h1>\n\
         {connection}\n\
         </body>\n\
         </html>\n",
        escape_html(detail)
    );
    STANDARD.encode(page)
}

/// Decode a `details` blob back into its HTML page.
#[must_use]
pub fn decode_details(blob: &str) -> Option<String> {
    STANDARD
        .decode(blob.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub id: String,
    pub status: SubmissionStatus,
    pub detail: String,
    pub created_at: Option<DateTime<Utc>>,
    pub details: Option<String>,
    pub abort_requested: bool,
}

impl From<SubmissionRecord> for StatusReport {
    fn from(record: SubmissionRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            detail: record.status_detail,
            created_at: record.submit_time,
            details: record.details,
            abort_requested: record.abort_requested,
        }
    }
}

/// Resource usage of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub runtime_seconds: i64,
}

/// Result of an abort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortOutcome {
    /// The abort flag was set by this call
    Initiated,
    /// An earlier call already requested abort; nothing changed
    AlreadyRequested,
}

impl AbortOutcome {
    /// Message the request layer returns for this outcome.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Initiated => "Submission removal initiated",
            Self::AlreadyRequested => "Already processing submission removal...",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_details_contain_status_and_connection() {
        let blob = render_details(
            SubmissionStatus::Running,
            APP_READY,
            Some("Endpoint: https://infra-1.eec.local"),
        );
        let page = decode_details(&blob).unwrap();
        assert!(page.contains("<b>RUNNING</b>"));
        assert!(page.contains(APP_READY));
        assert!(page.contains("https://infra-1.eec.local"));
    }

    #[test]
    fn test_details_without_infrastructure() {
        let page = decode_details(&render_details(SubmissionStatus::Init, INFRA_BUILDING, None))
            .unwrap();
        assert!(page.contains("No infrastructure"));
    }

    #[test]
    fn test_status_report_is_camel_case() {
        let report = StatusReport {
            id: "abc".to_string(),
            status: SubmissionStatus::Error,
            detail: "missing required field 'topology_template'".to_string(),
            created_at: None,
            details: None,
            abort_requested: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["abortRequested"], false);
    }

    #[test]
    fn test_abort_outcome_messages() {
        assert_eq!(
            AbortOutcome::AlreadyRequested.message(),
            "Already processing submission removal..."
        );
    }

    proptest! {
        #[test]
        fn prop_details_never_leak_markup(detail in ".{0,64}") {
            let page = decode_details(&render_details(SubmissionStatus::Error, &detail, None)).unwrap();
            let escaped = escape_html(&detail);
            prop_assert!(page.contains(&escaped));
            prop_assert!(!escaped.contains('<'));
        }
    }
}
