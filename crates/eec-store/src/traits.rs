use std::time::Duration;

use async_trait::async_trait;

use eec_utils::error::StoreError;

use crate::record::{RecordField, SubmissionRecord};

/// Durable key-value store holding one record per submission.
///
/// Records are written field by field. Each field has exactly one writer: the
/// submission's own worker, except `abort`, which only the abort operation
/// sets. Implementations therefore need no record-level locking, but every
/// single-field write must be atomic.
///
/// A record that has passed its expiry is invisible to every method and may
/// be purged lazily.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Health check, run once before the supervisor starts serving.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError>;

    async fn get_field(&self, id: &str, field: RecordField) -> Result<Option<String>, StoreError>;

    /// Write one field, creating the record if it does not exist.
    ///
    /// An existing expiry is kept.
    async fn set(&self, id: &str, field: RecordField, value: &str) -> Result<(), StoreError>;

    /// Write several fields of one record.
    ///
    /// Backends that can apply the writes as one unit should, so readers never
    /// see a status paired with the previous status detail.
    async fn set_fields(&self, id: &str, fields: &[(RecordField, &str)]) -> Result<(), StoreError> {
        for (field, value) in fields {
            self.set(id, *field, value).await?;
        }
        Ok(())
    }

    /// Write one field of an existing record. Returns whether the record
    /// existed; a missing record is left missing.
    async fn update(&self, id: &str, field: RecordField, value: &str) -> Result<bool, StoreError>;

    /// Remove one field. Removing an absent field is not an error.
    async fn clear(&self, id: &str, field: RecordField) -> Result<(), StoreError>;

    /// Delete the whole record. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Ids of all live records, sorted.
    async fn list_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn exists(&self, id: &str, field: RecordField) -> Result<bool, StoreError>;

    /// Schedule the record for removal after `ttl`. Returns whether it existed.
    async fn expire(&self, id: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Cancel a scheduled removal. Returns whether the record exists.
    async fn persist(&self, id: &str) -> Result<bool, StoreError>;
}
