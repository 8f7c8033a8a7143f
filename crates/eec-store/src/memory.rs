use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use eec_utils::error::StoreError;

use crate::record::{RecordField, SubmissionRecord};
use crate::traits::RecordStore;

#[derive(Debug, Clone, Default)]
struct Entry {
    fields: HashMap<RecordField, String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| now < exp)
    }
}

/// Process-local record store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiry still pending on a record, for tests and diagnostics.
    pub async fn time_to_live(&self, id: &str) -> Option<Duration> {
        let records = self.records.read().await;
        let now = Instant::now();
        records
            .get(id)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|exp| exp.saturating_duration_since(now))
    }

    async fn live_fields(&self, id: &str) -> Option<HashMap<RecordField, String>> {
        let records = self.records.read().await;
        match records.get(id) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.fields.clone()),
            Some(_) => {
                drop(records);
                self.records.write().await.remove(id);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError> {
        match self.live_fields(id).await {
            Some(fields) => SubmissionRecord::from_fields(id, &fields).map(Some),
            None => Ok(None),
        }
    }

    async fn get_field(&self, id: &str, field: RecordField) -> Result<Option<String>, StoreError> {
        Ok(self
            .live_fields(id)
            .await
            .and_then(|mut fields| fields.remove(&field)))
    }

    async fn set(&self, id: &str, field: RecordField, value: &str) -> Result<(), StoreError> {
        self.set_fields(id, &[(field, value)]).await
    }

    async fn set_fields(&self, id: &str, fields: &[(RecordField, &str)]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let now = Instant::now();
        let entry = records.entry(id.to_string()).or_default();
        if !entry.is_live(now) {
            *entry = Entry::default();
        }
        for (field, value) in fields {
            entry.fields.insert(*field, (*value).to_string());
        }
        Ok(())
    }

    async fn update(&self, id: &str, field: RecordField, value: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let now = Instant::now();
        match records.get_mut(id) {
            Some(entry) if entry.is_live(now) => {
                entry.fields.insert(field, value.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear(&self, id: &str, field: RecordField) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(entry) = records.get_mut(id) {
            entry.fields.remove(&field);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let now = Instant::now();
        Ok(records.remove(id).is_some_and(|entry| entry.is_live(now)))
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut records = self.records.write().await;
        let now = Instant::now();
        records.retain(|_, entry| entry.is_live(now));

        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn exists(&self, id: &str, field: RecordField) -> Result<bool, StoreError> {
        let records = self.records.read().await;
        let now = Instant::now();
        Ok(records
            .get(id)
            .is_some_and(|entry| entry.is_live(now) && entry.fields.contains_key(&field)))
    }

    async fn expire(&self, id: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let now = Instant::now();
        match records.get_mut(id) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn persist(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let now = Instant::now();
        match records.get_mut(id) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
