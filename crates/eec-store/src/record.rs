//! Submission record model and its field encoding.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use eec_utils::error::StoreError;

/// Lifecycle state of a submission.
///
/// The wire form is the uppercase state name, both in the store and in
/// status payloads.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Resolving the artefact, provisioning or deploying
    Init,
    /// Application deployed and live
    Running,
    /// A step failed; automatic progress stopped, still abortable
    Error,
    /// Teardown requested or in progress
    Aborted,
    /// Teardown complete; record awaits removal
    Stopped,
    /// Reserved for completion with output
    Results,
}

impl SubmissionStatus {
    /// An abort request is honoured from these states.
    #[must_use]
    pub fn is_abortable(self) -> bool {
        matches!(self, Self::Init | Self::Running | Self::Error)
    }
}

/// Individually writable fields of a record, by stable wire name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum RecordField {
    Status,
    StatusDetail,
    InfraId,
    SubmitTime,
    Abort,
    Details,
}

/// Snapshot of one submission as last durably written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub status: SubmissionStatus,
    pub status_detail: String,
    pub infra_id: Option<String>,
    pub submit_time: Option<DateTime<Utc>>,
    pub abort_requested: bool,
    pub details: Option<String>,
}

impl SubmissionRecord {
    /// Assemble a record from raw field values.
    ///
    /// A record whose `status` field has not been written yet reads as `INIT`.
    pub fn from_fields(id: &str, fields: &HashMap<RecordField, String>) -> Result<Self, StoreError> {
        let status = match fields.get(&RecordField::Status) {
            Some(raw) => decode_status(id, raw)?,
            None => SubmissionStatus::Init,
        };
        let submit_time = fields
            .get(&RecordField::SubmitTime)
            .map(|raw| decode_time(id, raw))
            .transpose()?;

        Ok(Self {
            id: id.to_string(),
            status,
            status_detail: fields
                .get(&RecordField::StatusDetail)
                .cloned()
                .unwrap_or_default(),
            infra_id: fields
                .get(&RecordField::InfraId)
                .filter(|v| !v.is_empty())
                .cloned(),
            submit_time,
            abort_requested: fields
                .get(&RecordField::Abort)
                .is_some_and(|v| decode_flag(v)),
            details: fields.get(&RecordField::Details).cloned(),
        })
    }
}

/// Encode a timestamp for the `submit_time` field.
#[must_use]
pub fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Encode a boolean for the `abort` field.
#[must_use]
pub fn encode_flag(flag: bool) -> &'static str {
    if flag { "true" } else { "false" }
}

fn decode_flag(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "True" | "1")
}

fn decode_status(id: &str, raw: &str) -> Result<SubmissionStatus, StoreError> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::Corrupt {
            id: id.to_string(),
            field: RecordField::Status.to_string(),
            reason: format!("unknown status '{raw}'"),
        })
}

fn decode_time(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            field: RecordField::SubmitTime.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_field_wire_names() {
        let names: Vec<String> = RecordField::iter().map(|f| f.to_string()).collect();
        assert_eq!(
            names,
            ["status", "status_detail", "infra_id", "submit_time", "abort", "details"]
        );
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(SubmissionStatus::Init.to_string(), "INIT");
        assert_eq!(SubmissionStatus::Aborted.as_ref(), "ABORTED");
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Stopped).unwrap(),
            "\"STOPPED\""
        );
        assert_eq!(
            "RUNNING".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Running
        );
    }

    #[test]
    fn test_abortable_states() {
        assert!(SubmissionStatus::Init.is_abortable());
        assert!(SubmissionStatus::Error.is_abortable());
        assert!(!SubmissionStatus::Aborted.is_abortable());
        assert!(!SubmissionStatus::Stopped.is_abortable());
    }

    #[test]
    fn test_from_fields_defaults_missing_values() {
        let fields = HashMap::from([(RecordField::Abort, "true".to_string())]);
        let record = SubmissionRecord::from_fields("abc", &fields).unwrap();
        assert_eq!(record.status, SubmissionStatus::Init);
        assert!(record.abort_requested);
        assert!(record.infra_id.is_none());
        assert!(record.submit_time.is_none());
    }

    #[test]
    fn test_from_fields_rejects_unknown_status() {
        let fields = HashMap::from([(RecordField::Status, "PAUSED".to_string())]);
        let err = SubmissionRecord::from_fields("abc", &fields).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref field, .. } if field == "status"));
    }

    #[test]
    fn test_empty_infra_id_reads_as_absent() {
        let fields = HashMap::from([(RecordField::InfraId, String::new())]);
        let record = SubmissionRecord::from_fields("abc", &fields).unwrap();
        assert!(record.infra_id.is_none());
    }

    proptest! {
        #[test]
        fn prop_status_wire_form_parses_back(index in 0usize..6) {
            let status = SubmissionStatus::iter().nth(index).unwrap();
            let fields = HashMap::from([(RecordField::Status, status.to_string())]);
            let record = SubmissionRecord::from_fields("id", &fields).unwrap();
            prop_assert_eq!(record.status, status);
        }

        #[test]
        fn prop_submit_time_survives_encoding(millis in 0i64..4_102_444_800_000) {
            let time = DateTime::<Utc>::from_timestamp_millis(millis).unwrap();
            let fields = HashMap::from([(RecordField::SubmitTime, encode_time(time))]);
            let record = SubmissionRecord::from_fields("id", &fields).unwrap();
            prop_assert_eq!(record.submit_time, Some(time));
        }
    }
}
