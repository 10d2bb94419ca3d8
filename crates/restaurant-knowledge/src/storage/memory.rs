//! In-process backend.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{RecordStore, Snapshot};
use crate::error::{Error, Result};
use crate::record::Record;

/// Keeps the collection in memory; the revision is a write counter.
///
/// Follows the same conditional-write rule as the persistent backends, which
/// makes it a drop-in substitute wherever a [`RecordStore`] is expected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Record>,
    writes: u64,
    last_message: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `records`.
    #[must_use]
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                records,
                writes: 1,
                last_message: None,
            }),
        }
    }

    /// Message passed to the most recent successful save.
    #[must_use]
    pub fn last_message(&self) -> Option<String> {
        self.lock().last_message.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-save.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MemoryState {
    fn revision(&self) -> Option<String> {
        (self.writes > 0).then(|| self.writes.to_string())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn describe(&self) -> String {
        "in-memory collection".to_string()
    }

    async fn load(&self) -> Result<Snapshot> {
        let state = self.lock();
        Ok(Snapshot {
            records: state.records.clone(),
            revision: state.revision(),
        })
    }

    async fn save(
        &self,
        records: &[Record],
        revision: Option<&str>,
        message: &str,
    ) -> Result<Option<String>> {
        let mut state = self.lock();
        if revision.is_some() && revision != state.revision().as_deref() {
            return Err(Error::conflict("in-memory collection"));
        }
        state.records = records.to_vec();
        state.writes += 1;
        state.last_message = Some(message.to_string());
        Ok(state.revision())
    }
}
