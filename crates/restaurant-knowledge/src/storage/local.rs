//! Local-disk backend.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{RecordStore, Snapshot};
use crate::error::{Error, Result};
use crate::record::Record;

/// Stores the collection as a pretty-printed JSON file.
///
/// The revision token is the BLAKE3 digest of the file bytes. Each write goes
/// to its own uniquely named temporary file in the same directory, which is
/// then renamed over the target.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    path: PathBuf,
}

impl LocalFileStore {
    /// Create a store for the file at `path`. Nothing is touched until use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn digest(bytes: &[u8]) -> String {
        blake3::hash(bytes).to_hex().to_string()
    }

    /// Current bytes of the file, or `None` if it does not exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::FileRead {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write `bytes` to a fresh temporary file next to the target and rename
    /// it into place. Runs on the blocking pool.
    async fn replace_contents(&self, bytes: Vec<u8>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replacing(&path, &bytes))
            .await
            .map_err(|e| Error::internal(format!("file write task failed: {e}")))?
    }
}

fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_error = |source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

#[async_trait]
impl RecordStore for LocalFileStore {
    fn describe(&self) -> String {
        format!("local file {}", self.path.display())
    }

    async fn load(&self) -> Result<Snapshot> {
        let Some(bytes) = self.read_bytes().await? else {
            debug!("{} does not exist, starting empty", self.path.display());
            return Ok(Snapshot::default());
        };

        let revision = Some(Self::digest(&bytes));
        let text = String::from_utf8(bytes)?;
        let records: Vec<Record> = if text.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&text)?
        };

        debug!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(Snapshot { records, revision })
    }

    async fn save(
        &self,
        records: &[Record],
        revision: Option<&str>,
        message: &str,
    ) -> Result<Option<String>> {
        if let Some(expected) = revision {
            let current = self.read_bytes().await?.map(|bytes| Self::digest(&bytes));
            if current.as_deref() != Some(expected) {
                warn!("{} changed since it was loaded", self.path.display());
                return Err(Error::conflict(self.path.display().to_string()));
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let text = serde_json::to_string_pretty(records)?;
        let revision = Self::digest(text.as_bytes());
        self.replace_contents(text.into_bytes()).await?;

        info!(
            "{message} ({} records written to {})",
            records.len(),
            self.path.display()
        );
        Ok(Some(revision))
    }
}
