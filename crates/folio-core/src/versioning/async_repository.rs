//! Async facade over [`ContentVersionRepository`].
//!
//! Every operation runs on the blocking thread pool, so SQLite I/O never
//! stalls the async runtime.

use std::sync::Arc;

use tokio::task;

use crate::error::{FolioError, FolioResult};
use crate::types::ContentItem;
use crate::versioning::{ContentVersion, ContentVersionRepository};

/// Async wrapper sharing one repository between tasks.
#[derive(Clone)]
pub struct AsyncContentVersionRepository {
    inner: Arc<ContentVersionRepository>,
}

impl AsyncContentVersionRepository {
    pub fn new(repository: ContentVersionRepository) -> Self {
        Self {
            inner: Arc::new(repository),
        }
    }

    /// The wrapped repository.
    pub fn blocking(&self) -> &ContentVersionRepository {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> FolioResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ContentVersionRepository) -> FolioResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| FolioError::Internal(format!("versioning task failed: {}", e)))?
    }

    pub async fn save(&self, item: ContentItem, saved_by: String) -> FolioResult<ContentVersion> {
        self.run(move |repo| repo.save(&item, &saved_by)).await
    }

    pub async fn get_version(&self, master: ContentItem) -> FolioResult<ContentVersion> {
        self.run(move |repo| repo.get_version(&master)).await
    }

    pub async fn get_version_at(
        &self,
        master: ContentItem,
        version_index: i32,
    ) -> FolioResult<ContentVersion> {
        self.run(move |repo| repo.get_version_at(&master, version_index))
            .await
    }

    pub async fn has_draft(&self, master: ContentItem) -> FolioResult<bool> {
        self.run(move |repo| repo.has_draft(&master)).await
    }

    pub async fn get_draft(&self, master: ContentItem) -> FolioResult<Option<ContentVersion>> {
        self.run(move |repo| repo.get_draft(&master)).await
    }

    pub async fn get_versions(&self, master: ContentItem) -> FolioResult<Vec<ContentVersion>> {
        self.run(move |repo| repo.get_versions(&master)).await
    }

    pub async fn flush(&self) -> FolioResult<()> {
        self.run(|repo| repo.flush()).await
    }
}
