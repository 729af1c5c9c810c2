//! Version storage layer.
//!
//! Provides SQLite-backed, append-only persistence for content version
//! records addressed by master id and version index.

use crate::error::{ErrorCode, FolioError, FolioResult};
use crate::types::{ContentState, ItemId};
use crate::versioning::ContentVersion;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode as SqliteErrorCode, OpenFlags, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Lazy sequence of version records produced by a store query.
pub type VersionIter<'a> = Box<dyn Iterator<Item = FolioResult<ContentVersion>> + 'a>;

/// Trait for content version storage operations
pub trait VersionStore: Send + Sync {
    /// Append a new version. Fails with a conflict if the master already has
    /// a version with the same index.
    fn insert(&self, version: &ContentVersion) -> FolioResult<()>;

    /// Get the version with the greatest index for a master
    fn find_latest(&self, master_id: ItemId) -> FolioResult<Option<ContentVersion>>;

    /// Get a specific version by index
    fn find_by_index(
        &self,
        master_id: ItemId,
        version_index: i32,
    ) -> FolioResult<Option<ContentVersion>>;

    /// Draft versions of a master, greatest index first. The sequence is
    /// read lazily and cannot be restarted; query again for a fresh one.
    fn find_drafts(&self, master_id: ItemId) -> VersionIter<'_>;

    /// All versions of a master, greatest index first
    fn find_all(&self, master_id: ItemId) -> FolioResult<Vec<ContentVersion>>;

    /// Greatest stored version index for a master
    fn greatest_version_index(&self, master_id: ItemId) -> FolioResult<Option<i32>>;

    /// Commit buffered writes and drop cached reads
    fn flush(&self) -> FolioResult<()>;

    /// Count total versions in store
    fn count_all(&self) -> FolioResult<usize>;
}

const SELECT_COLUMNS: &str = r#"SELECT id, master_id, version_index, title, state, saved_by, saved,
                      published, published_by, expires, item_count, version_data
               FROM content_versions"#;

/// SQLite-backed version store
#[derive(Debug)]
pub struct SqliteVersionStore {
    conn: Mutex<Connection>,
}

impl SqliteVersionStore {
    /// Create a new store at the given path
    pub fn new(path: impl AsRef<Path>) -> FolioResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::open_with_flags(path, OpenFlags::default())
    }

    /// Open a store that must already exist. Never creates a database file.
    pub fn open_existing(path: impl AsRef<Path>) -> FolioResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FolioError::Database {
                message: format!("no version database at {}", path.display()),
                code: ErrorCode::DbConnectionFailed,
                source: None,
            });
        }
        Self::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn open_with_flags(path: &Path, flags: OpenFlags) -> FolioResult<Self> {
        let conn = Connection::open_with_flags(path, flags).map_err(|e| FolioError::Database {
            message: format!("failed to open version database {}: {}", path.display(), e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> FolioResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> FolioResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FolioError::Internal(format!("version store lock poisoned: {}", e)))
    }

    fn init_schema(&self) -> FolioResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS content_versions (
                id TEXT PRIMARY KEY,
                master_id INTEGER NOT NULL,
                version_index INTEGER NOT NULL,
                title TEXT NOT NULL,
                state TEXT NOT NULL,
                saved_by TEXT,
                saved TEXT NOT NULL,
                published TEXT,
                published_by TEXT,
                expires TEXT,
                item_count INTEGER NOT NULL,
                version_data TEXT NOT NULL,
                UNIQUE(master_id, version_index)
            );

            -- Index for getting latest version
            CREATE INDEX IF NOT EXISTS idx_versions_master_index
                ON content_versions(master_id, version_index DESC);

            -- Index for draft lookups
            CREATE INDEX IF NOT EXISTS idx_versions_master_state
                ON content_versions(master_id, state, version_index DESC);
        "#,
        )?;
        Ok(())
    }

    fn parse_time(value: &str) -> FolioResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FolioError::database(format!("invalid timestamp '{}': {}", value, e)))
    }

    fn parse_optional_time(value: Option<String>) -> FolioResult<Option<DateTime<Utc>>> {
        value.as_deref().map(Self::parse_time).transpose()
    }

    fn row_to_version(row: &rusqlite::Row<'_>) -> FolioResult<ContentVersion> {
        let id: String = row.get(0)?;
        let master_id: i64 = row.get(1)?;
        let version_index: i32 = row.get(2)?;
        let title: String = row.get(3)?;
        let state: String = row.get(4)?;
        let saved_by: Option<String> = row.get(5)?;
        let saved: String = row.get(6)?;
        let published: Option<String> = row.get(7)?;
        let published_by: Option<String> = row.get(8)?;
        let expires: Option<String> = row.get(9)?;
        let item_count: u32 = row.get(10)?;
        let version_data: String = row.get(11)?;

        Ok(ContentVersion::from_parts(
            Uuid::parse_str(&id).map_err(|e| FolioError::database(e.to_string()))?,
            ItemId(master_id),
            version_index,
            title,
            ContentState::from_str(&state)
                .map_err(|_| FolioError::database(format!("unknown state '{}'", state)))?,
            saved_by,
            Self::parse_time(&saved)?,
            Self::parse_optional_time(published)?,
            published_by,
            Self::parse_optional_time(expires)?,
            item_count,
            version_data,
        ))
    }

    fn query_one(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> FolioResult<Option<ContentVersion>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        stmt.query_row(params, |row| Ok(Self::row_to_version(row)))
            .optional()?
            .transpose()
    }

    /// Next draft with an index below `before`, or the greatest draft.
    fn next_draft(
        &self,
        master_id: ItemId,
        before: Option<i32>,
    ) -> FolioResult<Option<ContentVersion>> {
        let state = ContentState::Draft.as_str();
        match before {
            None => self.query_one(
                &format!(
                    "{} WHERE master_id = ?1 AND state = ?2 ORDER BY version_index DESC, saved DESC LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![master_id.0, state],
            ),
            Some(index) => self.query_one(
                &format!(
                    "{} WHERE master_id = ?1 AND state = ?2 AND version_index < ?3 ORDER BY version_index DESC, saved DESC LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![master_id.0, state, index],
            ),
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == SqliteErrorCode::ConstraintViolation
    )
}

impl VersionStore for SqliteVersionStore {
    fn insert(&self, version: &ContentVersion) -> FolioResult<()> {
        let conn = self.lock()?;

        let result = conn.execute(
            r#"INSERT INTO content_versions
               (id, master_id, version_index, title, state, saved_by, saved,
                published, published_by, expires, item_count, version_data)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                version.id.to_string(),
                version.master_id.0,
                version.version_index,
                version.title,
                version.state.as_str(),
                version.saved_by,
                version.saved.to_rfc3339(),
                version.published.map(|p| p.to_rfc3339()),
                version.published_by,
                version.expires.map(|e| e.to_rfc3339()),
                version.item_count,
                version.version_data,
            ],
        );

        match result {
            Ok(_) => {
                debug!(
                    master_id = %version.master_id,
                    version_index = version.version_index,
                    "inserted version"
                );
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                warn!(
                    master_id = %version.master_id,
                    version_index = version.version_index,
                    "version already exists"
                );
                Err(FolioError::conflict(version.master_id, version.version_index))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_latest(&self, master_id: ItemId) -> FolioResult<Option<ContentVersion>> {
        self.query_one(
            &format!(
                "{} WHERE master_id = ?1 ORDER BY version_index DESC LIMIT 1",
                SELECT_COLUMNS
            ),
            params![master_id.0],
        )
    }

    fn find_by_index(
        &self,
        master_id: ItemId,
        version_index: i32,
    ) -> FolioResult<Option<ContentVersion>> {
        self.query_one(
            &format!(
                "{} WHERE master_id = ?1 AND version_index = ?2",
                SELECT_COLUMNS
            ),
            params![master_id.0, version_index],
        )
    }

    fn find_drafts(&self, master_id: ItemId) -> VersionIter<'_> {
        Box::new(DraftCursor {
            store: self,
            master_id,
            before: None,
            done: false,
        })
    }

    fn find_all(&self, master_id: ItemId) -> FolioResult<Vec<ContentVersion>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "{} WHERE master_id = ?1 ORDER BY version_index DESC",
            SELECT_COLUMNS
        ))?;

        let results = stmt.query_map(params![master_id.0], |row| Ok(Self::row_to_version(row)))?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn greatest_version_index(&self, master_id: ItemId) -> FolioResult<Option<i32>> {
        let conn = self.lock()?;
        let max: Option<i32> = conn.query_row(
            "SELECT MAX(version_index) FROM content_versions WHERE master_id = ?1",
            params![master_id.0],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn flush(&self) -> FolioResult<()> {
        let conn = self.lock()?;
        conn.flush_prepared_statement_cache();
        debug!("flushed version store");
        Ok(())
    }

    fn count_all(&self) -> FolioResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM content_versions", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

/// Keyset cursor over a master's drafts, one row per step.
struct DraftCursor<'a> {
    store: &'a SqliteVersionStore,
    master_id: ItemId,
    before: Option<i32>,
    done: bool,
}

impl Iterator for DraftCursor<'_> {
    type Item = FolioResult<ContentVersion>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.store.next_draft(self.master_id, self.before) {
            Ok(Some(version)) => {
                self.before = Some(version.version_index);
                Some(Ok(version))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
