//! folio-core - Core library for folio.
//!
//! This crate provides the content item model, version snapshots of item
//! subtrees, and draft tracking over an append-only version history.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use folio_core::{
//!     ContentItem, ContentState, ContentVersionRepository, InMemoryItemStore, ItemStore,
//!     SqliteVersionStore,
//! };
//!
//! let items = Arc::new(InMemoryItemStore::new());
//! let mut page = ContentItem::new("page");
//! items.save(&mut page)?;
//!
//! let repository = ContentVersionRepository::new(
//!     Arc::new(SqliteVersionStore::in_memory()?),
//!     items,
//! );
//!
//! let mut draft = page.clone_for_versioning();
//! draft.version_index = page.version_index + 1;
//! draft.state = ContentState::Draft;
//! repository.save(&draft, "editor")?;
//!
//! assert!(repository.has_draft(&page)?);
//! # Ok::<(), folio_core::FolioError>(())
//! ```

pub mod config;
pub mod error;
pub mod items;
pub mod traits;
pub mod types;
pub mod versioning;
pub mod workflow;

// Re-export commonly used types
pub use config::VersioningConfig;
pub use error::{ErrorCode, FolioError, FolioResult};
pub use items::InMemoryItemStore;
pub use traits::{ItemStore, KeepState, StateChanger};
pub use types::{
    ContentItem, ContentState, DetailCollection, DetailType, DetailValue, ItemId,
};
pub use versioning::{
    AsyncContentVersionRepository, ContentVersion, ContentVersionRepository, ItemSerializer,
    SqliteVersionStore, VersionStore, VersionSummary,
};
pub use workflow::WorkflowStateChanger;
