//! Storage layer for restaurant-knowledge.
//!
//! The collection is always read and written as one JSON document. Each
//! backend hands out an opaque revision token with every load; passing that
//! token back to [`RecordStore::save`] makes the write conditional on the
//! document being unchanged, and a mismatch comes back as
//! [`Error::Conflict`](crate::Error::Conflict).
//!
//! Which backend is used is decided once, from configuration, via
//! [`StorageMode`] and [`open_store`].

mod local;
mod memory;
mod remote;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::contents::{ContentsClient, FileLocation};
use crate::error::Result;
use crate::record::Record;

pub use local::LocalFileStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// The collection as loaded, with the revision it was read at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Records in insertion order.
    pub records: Vec<Record>,
    /// Revision token; `None` when the document does not exist yet.
    pub revision: Option<String>,
}

/// Whole-document persistence for the record collection.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Short description of where the collection lives (for logs and the CLI).
    fn describe(&self) -> String;

    /// Load the full collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read or parsed.
    async fn load(&self) -> Result<Snapshot>;

    /// Replace the full collection.
    ///
    /// `revision` is the token from the [`Snapshot`] the change was based on.
    /// `message` describes the change; backends with history record it.
    /// Returns the revision token of the written document, if the backend
    /// produces one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`](crate::Error::Conflict) if the document
    /// changed since `revision`, or a storage error if the write fails.
    async fn save(
        &self,
        records: &[Record],
        revision: Option<&str>,
        message: &str,
    ) -> Result<Option<String>>;
}

/// Where the collection is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// A JSON file on the local disk.
    Local {
        /// Path of the JSON file.
        path: PathBuf,
    },
    /// A JSON file in a remote repository, via its contents API.
    Remote(RemoteTarget),
}

/// Everything needed to reach the remote collection file.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Repository and path of the file.
    pub location: FileLocation,
    /// Access token sent with every request.
    pub token: String,
    /// Root URL of the contents API.
    pub api_base: String,
    /// Per-request timeout; `None` for no limit.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("location", &self.location)
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "local file {}", path.display()),
            Self::Remote(target) => write!(f, "remote file {}", target.location),
        }
    }
}

/// Build the store selected by `mode`.
///
/// # Errors
///
/// Returns an error if the remote HTTP client cannot be created.
pub fn open_store(mode: &StorageMode) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match mode {
        StorageMode::Local { path } => Arc::new(LocalFileStore::new(path.clone())),
        StorageMode::Remote(target) => {
            let client = ContentsClient::new(
                target.api_base.clone(),
                target.token.clone(),
                target.timeout,
            )?;
            Arc::new(RemoteStore::new(client, target.location.clone()))
        }
    };
    tracing::info!("Using {}", store.describe());
    Ok(store)
}
