use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Rating, Record, RecordId};
use crate::store::{RecordStore, SortOrder};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(usize),
    /// Another refresh was already in flight.
    Skipped,
}

/// Shared application state. Holds the last successful snapshot of the
/// store; a failed read leaves the previous snapshot in place.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    records: Arc<RwLock<Vec<Record>>>,
    refresh_gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            records: Arc::new(RwLock::new(Vec::new())),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Wall-clock time in the configured zone.
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.config.utc_offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Snapshot in store order, newest first.
    pub async fn records(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }

    /// Reloads the snapshot, waiting for any refresh already in flight.
    pub async fn refresh(&self) -> Result<usize, AppError> {
        let _gate = self.refresh_gate.lock().await;
        self.reload().await
    }

    /// Reloads the snapshot unless a refresh is already running.
    pub async fn try_refresh(&self) -> Result<RefreshOutcome, AppError> {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            return Ok(RefreshOutcome::Skipped);
        };
        self.reload().await.map(RefreshOutcome::Refreshed)
    }

    async fn reload(&self) -> Result<usize, AppError> {
        let fresh = self
            .store
            .list(self.config.list_limit, SortOrder::Descending)
            .await?;
        let count = fresh.len();
        *self.records.write().await = fresh;
        Ok(count)
    }

    pub async fn create_record(
        &self,
        date: NaiveDateTime,
        rating: Rating,
    ) -> Result<Record, AppError> {
        let record = self.store.create(date, rating).await?;
        info!(id = %record.id, rating = %rating, "recorded moment");
        self.refresh_after_write().await;
        Ok(record)
    }

    pub async fn update_rating(&self, id: &RecordId, rating: Rating) -> Result<(), AppError> {
        self.store.update(id, rating).await?;
        info!(id = %id, rating = %rating, "updated moment rating");
        self.refresh_after_write().await;
        Ok(())
    }

    pub async fn delete_record(&self, id: &RecordId) -> Result<(), AppError> {
        self.store.delete(id).await?;
        info!(id = %id, "deleted moment");
        self.refresh_after_write().await;
        Ok(())
    }

    // The write already succeeded; a failed re-read only leaves the snapshot stale.
    async fn refresh_after_write(&self) {
        if let Err(err) = self.refresh().await {
            error!("refresh after write failed: {err}");
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    use chrono::FixedOffset;
    use std::time::Duration;

    Config {
        port: 0,
        data_path: "unused.json".into(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        refresh_interval: Duration::from_millis(20),
        list_limit: 1000,
    }
}
