//! Record store adapter. The shipped implementation keeps every record in
//! one JSON document; rows are validated into strict [`Record`]s on the way
//! out so nothing downstream ever sees an out-of-range rating.

use crate::errors::StoreError;
use crate::models::{Rating, Record, RecordId};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// CRUD contract the application relies on. No partial success: every call
/// either completes or returns a [`StoreError`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Up to `limit` records ordered by creation time.
    async fn list(&self, limit: usize, order: SortOrder) -> Result<Vec<Record>, StoreError>;

    async fn create(&self, date: NaiveDateTime, rating: Rating) -> Result<Record, StoreError>;

    async fn update(&self, id: &RecordId, rating: Rating) -> Result<(), StoreError>;

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    records: Vec<StoredRecord>,
}

/// A row as persisted. Fields are kept loose so hand-edited or older
/// documents still load; validation happens in [`StoredRecord::to_record`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    date: String,
    rating: Value,
    created_at: DateTime<Utc>,
}

impl StoredRecord {
    fn to_record(&self, offset: FixedOffset) -> Result<Record, String> {
        let date = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|err| format!("date '{}' is not RFC 3339: {err}", self.date))?
            .with_timezone(&offset)
            .naive_local();
        let raw = match &self.rating {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| format!("rating {} is not an integer", self.rating))?;
        let rating = Rating::new(raw).map_err(|err| err.to_string())?;

        Ok(Record {
            id: RecordId(self.id.clone()),
            date,
            rating,
        })
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    offset: FixedOffset,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// `offset` is the zone record timestamps are read and written in.
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            offset,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<StoredDocument, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoredDocument::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_document(&self, document: &StoredDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(document)?;
        fs::write(&self.path, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn list(&self, limit: usize, order: SortOrder) -> Result<Vec<Record>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut rows = self.read_document().await?.records;
        rows.sort_by_key(|row| row.created_at);
        if order == SortOrder::Descending {
            rows.reverse();
        }

        let records = rows
            .iter()
            .filter_map(|row| match row.to_record(self.offset) {
                Ok(record) => Some(record),
                Err(reason) => {
                    warn!(id = %row.id, "skipping invalid stored record: {reason}");
                    None
                }
            })
            .take(limit)
            .collect();
        Ok(records)
    }

    async fn create(&self, date: NaiveDateTime, rating: Rating) -> Result<Record, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;

        let shift = TimeDelta::seconds(i64::from(self.offset.local_minus_utc()));
        let utc = date
            .checked_sub_signed(shift)
            .ok_or_else(|| StoreError::OutOfRange(date.to_string()))?;
        let stamped = DateTime::<FixedOffset>::from_naive_utc_and_offset(utc, self.offset);
        let id = uuid::Uuid::new_v4().to_string();
        document.records.push(StoredRecord {
            id: id.clone(),
            date: stamped.to_rfc3339(),
            rating: Value::from(rating.value()),
            created_at: Utc::now(),
        });
        self.write_document(&document).await?;

        Ok(Record {
            id: RecordId(id),
            date,
            rating,
        })
    }

    async fn update(&self, id: &RecordId, rating: Rating) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let row = document
            .records
            .iter_mut()
            .find(|row| row.id == id.0)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.rating = Value::from(rating.value());
        self.write_document(&document).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let before = document.records.len();
        document.records.retain(|row| row.id != id.0);
        if document.records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.write_document(&document).await
    }
}
