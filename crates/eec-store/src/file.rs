//! File-backed record store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<id>/status         JSON object holding status, status_detail and details
//! <root>/<id>/infra_id       one file per other written field
//! <root>/<id>/...
//! <root>/<id>/expires_at     unix milliseconds, present once expiry is scheduled
//! ```
//!
//! Every file is replaced atomically, so concurrent readers in any process
//! see either the old or the new value. The status, its detail and the
//! details blob share one file and therefore change together. Names starting
//! with `.` in the root are reserved (the serve lock lives there) and never
//! listed.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use strum::IntoEnumIterator;

use eec_utils::atomic_write::{replace_file_atomic, write_file_atomic};
use eec_utils::error::StoreError;

use crate::record::{RecordField, SubmissionRecord};
use crate::traits::RecordStore;

const EXPIRY_MARKER: &str = "expires_at";
const STATUS_FILE: &str = "status";

/// Status fields keyed by wire name, as stored in the status file.
type StatusFields = BTreeMap<String, String>;

/// Record store persisting each record as a directory of field files.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || op(&root))
            .await
            .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
    }
}

fn record_dir(root: &Path, id: &str) -> Result<PathBuf, StoreError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(StoreError::Backend(format!("invalid record id '{id}'")));
    }
    Ok(root.join(id))
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_file_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn remove_dir_if_present(dir: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether the record directory exists and has not expired. Expired records
/// are purged on the way.
fn is_live(dir: &Path) -> Result<bool, StoreError> {
    if !dir.is_dir() {
        return Ok(false);
    }
    let Some(raw) = read_optional(&dir.join(EXPIRY_MARKER))? else {
        return Ok(true);
    };
    let expires_at: i64 = raw.trim().parse().unwrap_or(0);
    if Utc::now().timestamp_millis() < expires_at {
        return Ok(true);
    }
    tracing::debug!(record = %dir.display(), "Purging expired record");
    remove_dir_if_present(dir)?;
    Ok(false)
}

fn in_status_file(field: RecordField) -> bool {
    matches!(
        field,
        RecordField::Status | RecordField::StatusDetail | RecordField::Details
    )
}

fn read_status_file(dir: &Path, id: &str) -> Result<StatusFields, StoreError> {
    let Some(raw) = read_optional(&dir.join(STATUS_FILE))? else {
        return Ok(StatusFields::new());
    };
    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        field: STATUS_FILE.to_string(),
        reason: e.to_string(),
    })
}

fn write_status_file(dir: &Path, status: &StatusFields, create: bool) -> Result<(), StoreError> {
    let body = serde_json::to_vec(status).map_err(|e| StoreError::Backend(e.to_string()))?;
    write_in(&dir.join(STATUS_FILE), &body, create)
}

/// With `create` unset, a missing record directory fails with `NotFound`
/// instead of being created.
fn write_in(path: &Path, content: &[u8], create: bool) -> Result<(), StoreError> {
    if create {
        write_file_atomic(path, content)?;
    } else {
        replace_file_atomic(path, content)?;
    }
    Ok(())
}

fn read_fields(dir: &Path, id: &str) -> Result<HashMap<RecordField, String>, StoreError> {
    let status = read_status_file(dir, id)?;
    let mut fields = HashMap::new();
    for field in RecordField::iter() {
        let value = if in_status_file(field) {
            status.get(field.as_ref()).cloned()
        } else {
            read_optional(&dir.join(field.as_ref()))?
        };
        if let Some(value) = value {
            fields.insert(field, value);
        }
    }
    Ok(fields)
}

/// Status fields are merged into the status file with a single replace.
fn write_fields(
    dir: &Path,
    id: &str,
    fields: &[(RecordField, String)],
    create: bool,
) -> Result<(), StoreError> {
    let (status_fields, own_files): (Vec<_>, Vec<_>) =
        fields.iter().partition(|(field, _)| in_status_file(*field));

    if !status_fields.is_empty() {
        let mut status = read_status_file(dir, id)?;
        for (field, value) in status_fields {
            status.insert(field.as_ref().to_string(), value.clone());
        }
        write_status_file(dir, &status, create)?;
    }
    for (field, value) in own_files {
        write_in(&dir.join(field.as_ref()), value.as_bytes(), create)?;
    }
    Ok(())
}

fn owned(fields: &[(RecordField, &str)]) -> Vec<(RecordField, String)> {
    fields
        .iter()
        .map(|(field, value)| (*field, (*value).to_string()))
        .collect()
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.run(|root| {
            eec_utils::paths::ensure_dir_all(root).map_err(|e| {
                StoreError::Connection(format!("store root {} unusable: {e}", root.display()))
            })?;
            let marker = root.join(".ping");
            write_file_atomic(&marker, b"ok")
                .and_then(|()| fs::remove_file(&marker))
                .map_err(|e| {
                    StoreError::Connection(format!("store root {} not writable: {e}", root.display()))
                })
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            if !is_live(&dir)? {
                return Ok(None);
            }
            let fields = read_fields(&dir, &id)?;
            SubmissionRecord::from_fields(&id, &fields).map(Some)
        })
        .await
    }

    async fn get_field(&self, id: &str, field: RecordField) -> Result<Option<String>, StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            if !is_live(&dir)? {
                return Ok(None);
            }
            Ok(read_fields(&dir, &id)?.remove(&field))
        })
        .await
    }

    async fn set(&self, id: &str, field: RecordField, value: &str) -> Result<(), StoreError> {
        self.set_fields(id, &[(field, value)]).await
    }

    async fn set_fields(&self, id: &str, fields: &[(RecordField, &str)]) -> Result<(), StoreError> {
        let id = id.to_string();
        let fields = owned(fields);
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            // An expired record is replaced, not revived with its old fields.
            is_live(&dir)?;
            write_fields(&dir, &id, &fields, true)
        })
        .await
    }

    async fn update(&self, id: &str, field: RecordField, value: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        let fields = vec![(field, value.to_string())];
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            if !is_live(&dir)? {
                return Ok(false);
            }
            match write_fields(&dir, &id, &fields, false) {
                Ok(()) => Ok(true),
                // Deleted between the check and the write.
                Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn clear(&self, id: &str, field: RecordField) -> Result<(), StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            if !in_status_file(field) {
                return Ok(remove_file_if_present(&dir.join(field.as_ref()))?);
            }
            let mut status = read_status_file(&dir, &id)?;
            if status.remove(field.as_ref()).is_none() {
                return Ok(());
            }
            match write_status_file(&dir, &status, false) {
                Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            let live = is_live(&dir)?;
            let removed = remove_dir_if_present(&dir)?;
            Ok(live && removed)
        })
        .await
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        self.run(|root| {
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut ids = Vec::new();
            for entry in entries {
                let entry = entry?;
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                if is_live(&entry.path())? {
                    ids.push(name);
                }
            }
            ids.sort();
            Ok(ids)
        })
        .await
    }

    async fn exists(&self, id: &str, field: RecordField) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            Ok(is_live(&dir)? && read_fields(&dir, &id)?.contains_key(&field))
        })
        .await
    }

    async fn expire(&self, id: &str, ttl: Duration) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            if !is_live(&dir)? {
                return Ok(false);
            }
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_ms);
            write_file_atomic(&dir.join(EXPIRY_MARKER), expires_at.to_string().as_bytes())?;
            Ok(true)
        })
        .await
    }

    async fn persist(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |root| {
            let dir = record_dir(root, &id)?;
            if !is_live(&dir)? {
                return Ok(false);
            }
            remove_file_if_present(&dir.join(EXPIRY_MARKER))?;
            Ok(true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SubmissionStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fields_persist_across_instances() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        store.set("sub-1", RecordField::Status, "RUNNING").await.unwrap();
        store.set("sub-1", RecordField::InfraId, "infra-9").await.unwrap();

        let reopened = FileRecordStore::new(temp.path());
        let record = reopened.get("sub-1").await.unwrap().unwrap();
        assert_eq!(record.status, SubmissionStatus::Running);
        assert_eq!(record.infra_id.as_deref(), Some("infra-9"));
        assert_eq!(reopened.list_ids().await.unwrap(), vec!["sub-1".to_string()]);
    }

    #[tokio::test]
    async fn test_list_skips_reserved_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".serve.lock"), "{}").unwrap();
        let store = FileRecordStore::new(temp.path());
        store.set("b", RecordField::Status, "INIT").await.unwrap();
        store.set("a", RecordField::Status, "INIT").await.unwrap();

        assert_eq!(store.list_ids().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        store.set("a", RecordField::Status, "ERROR").await.unwrap();

        assert!(store.expire("a", Duration::ZERO).await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
        assert!(!temp.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_future_expiry_keeps_record_visible() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        store.set("a", RecordField::Status, "ERROR").await.unwrap();
        store.expire("a", Duration::from_secs(90)).await.unwrap();

        assert!(store.get("a").await.unwrap().is_some());
        assert!(temp.path().join("a").join(EXPIRY_MARKER).is_file());
    }

    #[tokio::test]
    async fn test_clear_and_delete() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        store.set("a", RecordField::InfraId, "infra-1").await.unwrap();
        store.clear("a", RecordField::InfraId).await.unwrap();
        store.clear("a", RecordField::InfraId).await.unwrap();
        assert!(!store.exists("a", RecordField::InfraId).await.unwrap());

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_status_triple_is_one_file() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        store
            .set_fields(
                "a",
                &[
                    (RecordField::Status, "INIT"),
                    (RecordField::StatusDetail, "infrastructure building"),
                    (RecordField::Details, "PGh0bWw+"),
                ],
            )
            .await
            .unwrap();
        store
            .set_fields(
                "a",
                &[
                    (RecordField::Status, "RUNNING"),
                    (RecordField::StatusDetail, "application is ready"),
                ],
            )
            .await
            .unwrap();

        let dir = temp.path().join("a");
        assert!(!dir.join("status_detail").exists());
        assert!(!dir.join("details").exists());
        let on_disk: StatusFields =
            serde_json::from_str(&fs::read_to_string(dir.join(STATUS_FILE)).unwrap()).unwrap();
        assert_eq!(on_disk["status"], "RUNNING");
        assert_eq!(on_disk["status_detail"], "application is ready");
        assert_eq!(on_disk["details"], "PGh0bWw+");

        let record = store.get("a").await.unwrap().unwrap();
        assert_eq!(record.status, SubmissionStatus::Running);
        assert_eq!(record.status_detail, "application is ready");
        assert!(store.exists("a", RecordField::Details).await.unwrap());

        store.clear("a", RecordField::Details).await.unwrap();
        assert!(!store.exists("a", RecordField::Details).await.unwrap());
        assert_eq!(
            store.get_field("a", RecordField::Status).await.unwrap().as_deref(),
            Some("RUNNING")
        );
    }

    #[tokio::test]
    async fn test_corrupt_status_file_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a").join(STATUS_FILE), "RUNNING").unwrap();

        let store = FileRecordStore::new(temp.path());
        assert!(matches!(
            store.get("a").await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_never_recreates_a_record() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        assert!(!store.update("gone", RecordField::Abort, "true").await.unwrap());
        assert!(!temp.path().join("gone").exists());

        store.set("a", RecordField::Status, "STOPPED").await.unwrap();
        assert!(store.update("a", RecordField::Abort, "true").await.unwrap());
        assert!(store.get("a").await.unwrap().unwrap().abort_requested);

        store.expire("a", Duration::ZERO).await.unwrap();
        assert!(!store.update("a", RecordField::Abort, "true").await.unwrap());
        assert!(!temp.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_persist_removes_expiry_marker() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        store.set("a", RecordField::Status, "ERROR").await.unwrap();
        store.expire("a", Duration::from_secs(90)).await.unwrap();

        assert!(store.persist("a").await.unwrap());
        assert!(!temp.path().join("a").join(EXPIRY_MARKER).exists());
        assert!(!store.persist("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let temp = TempDir::new().unwrap();
        let store = FileRecordStore::new(temp.path());
        for id in ["", "..", "../escape", "a/b", ".hidden"] {
            assert!(store.set(id, RecordField::Status, "INIT").await.is_err(), "{id}");
        }
    }

    #[tokio::test]
    async fn test_ping_creates_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("records");
        let store = FileRecordStore::new(&root);
        store.ping().await.unwrap();
        assert!(root.is_dir());
        assert!(store.list_ids().await.unwrap().is_empty());
    }
}
