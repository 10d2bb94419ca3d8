//! Remote repository backend.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{RecordStore, Snapshot};
use crate::contents::{ContentsClient, FileLocation};
use crate::error::Result;
use crate::record::Record;

/// Stores the collection as a file in a remote repository.
///
/// The revision token is the file's blob sha. Every save is a commit whose
/// message describes the change.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: ContentsClient,
    location: FileLocation,
}

impl RemoteStore {
    /// Create a store for `location`, reached through `client`.
    #[must_use]
    pub fn new(client: ContentsClient, location: FileLocation) -> Self {
        Self { client, location }
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    fn describe(&self) -> String {
        format!("remote file {}", self.location)
    }

    async fn load(&self) -> Result<Snapshot> {
        let file = self.client.get_array::<Record>(&self.location).await?;
        debug!(
            "Loaded {} records from {} at {:?}",
            file.content.len(),
            self.location,
            file.sha
        );
        Ok(Snapshot {
            records: file.content,
            revision: file.sha,
        })
    }

    async fn save(
        &self,
        records: &[Record],
        revision: Option<&str>,
        message: &str,
    ) -> Result<Option<String>> {
        let sha = self
            .client
            .put_array(&self.location, records, revision, message)
            .await?;
        info!("{message} (committed to {})", self.location);
        Ok(sha)
    }
}
