//! Content version repository.
//!
//! Saves snapshots of content subtrees as version records and reads them
//! back, by latest index, by exact index, or as the current draft.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::VersioningConfig;
use crate::error::{ErrorCode, FolioError, FolioResult};
use crate::traits::ItemStore;
use crate::types::{ContentItem, ItemId};
use crate::versioning::draft::{contains_draft, select_draft};
use crate::versioning::{ContentVersion, ItemSerializer, SqliteVersionStore, VersionStore};

/// Versioning repository composing the serializer, the version store and
/// the item store.
pub struct ContentVersionRepository {
    store: Arc<dyn VersionStore>,
    items: Arc<dyn ItemStore>,
    serializer: ItemSerializer,
    verify_masters: bool,
}

impl ContentVersionRepository {
    /// Create a repository over the given stores.
    pub fn new(store: Arc<dyn VersionStore>, items: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            items,
            serializer: ItemSerializer::new(),
            verify_masters: true,
        }
    }

    /// Open the SQLite store described by `config`.
    pub fn from_config(config: &VersioningConfig, items: Arc<dyn ItemStore>) -> FolioResult<Self> {
        let store: Arc<dyn VersionStore> = if config.in_memory {
            Arc::new(SqliteVersionStore::in_memory()?)
        } else {
            Arc::new(SqliteVersionStore::new(&config.database_path)?)
        };
        Ok(Self::new(store, items)
            .with_pretty_blobs(config.pretty_blobs)
            .with_master_verification(config.verify_masters))
    }

    /// Pretty-print written blobs.
    pub fn with_pretty_blobs(mut self, pretty: bool) -> Self {
        self.serializer = self.serializer.pretty(pretty);
        self
    }

    /// Require every `version_of` in rebuilt trees to resolve to a live item.
    pub fn with_master_verification(mut self, verify: bool) -> Self {
        self.verify_masters = verify;
        self
    }

    /// Save a snapshot of `item` and its descendants as a new version.
    ///
    /// The master is `item.version_of`, or `item` itself when it is not a
    /// version of anything. State, version index and published timestamp
    /// are read from `item` as they are now.
    #[instrument(skip(self, item), fields(title = %item.title, version_index = item.version_index))]
    pub fn save(&self, item: &ContentItem, saved_by: &str) -> FolioResult<ContentVersion> {
        let master_id = item.master_id().ok_or_else(|| FolioError::Validation {
            message: format!(
                "item '{}' has no id and is not a version of a master",
                item.title
            ),
            code: ErrorCode::ValMissingIdentity,
            suggestion: Some("Persist the item or set version_of before versioning it".to_string()),
        })?;

        let blob = self.serializer.serialize(item)?;
        let version = ContentVersion::from_snapshot(master_id, item, blob, saved_by);
        self.store.insert(&version)?;

        info!(
            master_id = %master_id,
            version_index = version.version_index,
            state = %version.state,
            items = version.item_count,
            "saved version"
        );
        Ok(self.attach(version))
    }

    /// Latest version of a master, draft or not.
    pub fn get_version(&self, master: &ContentItem) -> FolioResult<ContentVersion> {
        let master_id = Self::require_master_id(master)?;
        self.store
            .find_latest(master_id)?
            .map(|v| self.attach(v))
            .ok_or_else(|| FolioError::not_found(master_id))
    }

    /// Version of a master with exactly this index.
    pub fn get_version_at(
        &self,
        master: &ContentItem,
        version_index: i32,
    ) -> FolioResult<ContentVersion> {
        let master_id = Self::require_master_id(master)?;
        self.store
            .find_by_index(master_id, version_index)?
            .map(|v| self.attach(v))
            .ok_or_else(|| FolioError::version_not_found(master_id, version_index))
    }

    /// Whether the master has at least one draft version.
    pub fn has_draft(&self, master: &ContentItem) -> FolioResult<bool> {
        let master_id = Self::require_master_id(master)?;
        contains_draft(self.store.find_drafts(master_id))
    }

    /// Current draft of the master, if any.
    pub fn get_draft(&self, master: &ContentItem) -> FolioResult<Option<ContentVersion>> {
        let master_id = Self::require_master_id(master)?;
        let draft = select_draft(self.store.find_drafts(master_id))?;
        debug!(master_id = %master_id, found = draft.is_some(), "draft lookup");
        Ok(draft.map(|v| self.attach(v)))
    }

    /// Full history of a master, greatest index first.
    pub fn get_versions(&self, master: &ContentItem) -> FolioResult<Vec<ContentVersion>> {
        let master_id = Self::require_master_id(master)?;
        Ok(self
            .store
            .find_all(master_id)?
            .into_iter()
            .map(|v| self.attach(v))
            .collect())
    }

    /// Greatest stored version index of a master.
    pub fn greatest_version_index(&self, master: &ContentItem) -> FolioResult<Option<i32>> {
        let master_id = Self::require_master_id(master)?;
        self.store.greatest_version_index(master_id)
    }

    /// Commit buffered writes and drop cached reads in the version store.
    pub fn flush(&self) -> FolioResult<()> {
        self.store.flush()
    }

    fn attach(&self, version: ContentVersion) -> ContentVersion {
        version.with_resolver(Arc::clone(&self.items), self.verify_masters)
    }

    fn require_master_id(master: &ContentItem) -> FolioResult<ItemId> {
        master.master_id().ok_or_else(|| FolioError::Validation {
            message: format!("item '{}' has not been persisted", master.title),
            code: ErrorCode::ValMissingIdentity,
            suggestion: None,
        })
    }
}
