//! Content versioning: snapshots, version history and draft tracking.
//!
//! A version is an immutable snapshot of a master item's subtree. History is
//! append-only; the current draft is selected from it, never stored apart.

mod async_repository;
mod cloner;
pub mod draft;
mod repository;
mod serializer;
mod store;
mod version;

pub use async_repository::AsyncContentVersionRepository;
pub use repository::ContentVersionRepository;
pub use serializer::{ItemSerializer, BLOB_FORMAT};
pub use store::{SqliteVersionStore, VersionIter, VersionStore};
pub use version::{ContentVersion, VersionSummary};
