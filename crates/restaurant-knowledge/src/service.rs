//! Record operations on top of a [`RecordStore`].
//!
//! Every call loads the whole collection, changes it in memory and writes it
//! back with the revision it was loaded at. Nothing is cached between calls.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::record::{next_id, position, Record, RecordInput};
use crate::storage::{RecordStore, Snapshot};

/// The five record operations.
#[derive(Debug, Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Where the collection lives.
    #[must_use]
    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// All records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the collection cannot be loaded.
    pub async fn list(&self) -> Result<Vec<Record>> {
        Ok(self.load().await?.records)
    }

    /// Validate `input`, append it as a new record and persist.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if a required field is missing (nothing is
    /// loaded or written in that case), otherwise any storage error.
    pub async fn create(&self, input: RecordInput) -> Result<Record> {
        input.validate()?;

        let Snapshot {
            mut records,
            revision,
        } = self.load().await?;
        let now = Utc::now();
        let record = Record::from_input(next_id(&records, now), now, input)?;
        let message = format!("Add restaurant: {}", record.name);
        records.push(record.clone());

        self.save(&records, revision, &message).await?;
        Ok(record)
    }

    /// The record with `id`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if there is no such record, otherwise any storage
    /// error.
    pub async fn get(&self, id: &str) -> Result<Record> {
        let mut records = self.load().await?.records;
        match position(&records, id) {
            Some(index) => Ok(records.swap_remove(index)),
            None => Err(Error::not_found(id)),
        }
    }

    /// Overwrite every field of record `id` except `id` and `createdAt`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for missing required fields (checked before
    /// loading), [`Error::NotFound`] for an unknown id, otherwise any storage
    /// error.
    pub async fn update(&self, id: &str, input: RecordInput) -> Result<Record> {
        input.validate()?;

        let Snapshot {
            mut records,
            revision,
        } = self.load().await?;
        let index = position(&records, id).ok_or_else(|| Error::not_found(id))?;
        let updated = records[index].with_changes(input)?;
        let message = format!("Update restaurant: {}", updated.name);
        records[index] = updated.clone();

        self.save(&records, revision, &message).await?;
        Ok(updated)
    }

    /// Remove record `id` and return it.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id, otherwise any storage error.
    pub async fn delete(&self, id: &str) -> Result<Record> {
        let Snapshot {
            mut records,
            revision,
        } = self.load().await?;
        let index = position(&records, id).ok_or_else(|| Error::not_found(id))?;
        let removed = records.remove(index);
        let message = format!("Delete restaurant: {}", removed.name);

        self.save(&records, revision, &message).await?;
        Ok(removed)
    }

    async fn load(&self) -> Result<Snapshot> {
        self.store.load().await.inspect_err(|e| {
            error!("Failed to load {}: {e}", self.store.describe());
        })
    }

    async fn save(
        &self,
        records: &[Record],
        revision: Option<String>,
        message: &str,
    ) -> Result<()> {
        let written = self
            .store
            .save(records, revision.as_deref(), message)
            .await
            .inspect_err(|e| {
                error!("Failed to save {}: {e}", self.store.describe());
            })?;
        debug!("Saved {} records, revision {written:?}", records.len());
        Ok(())
    }
}
