//! Subcommand implementations.
//!
//! Commands read straight from the version store. There is no live item
//! store here, so rebuilt trees are shown without resolving their masters
//! and `verify_masters` has nothing to check against.

use std::io::Write;

use anyhow::{bail, Context, Result};
use folio_core::versioning::draft::select_draft;
use folio_core::{
    ContentItem, ContentVersion, FolioError, ItemId, SqliteVersionStore, VersionStore,
    VersionSummary, VersioningConfig,
};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize)]
struct VersionView<'a> {
    version: VersionSummary,
    tree: &'a ContentItem,
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_version(out: &mut impl Write, version: &ContentVersion, pretty: bool) -> Result<()> {
    let view = VersionView {
        version: version.summary(),
        tree: version.version()?,
    };
    write_json(out, &view, pretty)
}

/// Open the configured database. Inspection never creates one.
pub fn open_store(config: &VersioningConfig) -> Result<SqliteVersionStore> {
    if config.in_memory {
        bail!("an in-memory configuration has no version database to inspect");
    }
    if config.verify_masters {
        warn!("no item store is available, masters of rebuilt versions are not verified");
    }
    debug!(db = %config.database_path.display(), "opening version store");
    SqliteVersionStore::open_existing(&config.database_path).with_context(|| {
        format!(
            "cannot inspect version database {}",
            config.database_path.display()
        )
    })
}

pub fn history(
    store: &dyn VersionStore,
    master_id: i64,
    pretty: bool,
    out: &mut impl Write,
) -> Result<()> {
    let summaries: Vec<VersionSummary> = store
        .find_all(ItemId(master_id))?
        .iter()
        .map(ContentVersion::summary)
        .collect();
    write_json(out, &summaries, pretty)
}

pub fn show(
    store: &dyn VersionStore,
    master_id: i64,
    index: Option<i32>,
    pretty: bool,
    out: &mut impl Write,
) -> Result<()> {
    let master_id = ItemId(master_id);
    let version = match index {
        Some(index) => store
            .find_by_index(master_id, index)?
            .ok_or_else(|| FolioError::version_not_found(master_id, index))?,
        None => store
            .find_latest(master_id)?
            .ok_or_else(|| FolioError::not_found(master_id))?,
    };
    write_version(out, &version, pretty)
}

pub fn draft(
    store: &dyn VersionStore,
    master_id: i64,
    pretty: bool,
    out: &mut impl Write,
) -> Result<()> {
    match select_draft(store.find_drafts(ItemId(master_id)))? {
        Some(version) => write_version(out, &version, pretty),
        None => write_json(out, &serde_json::Value::Null, pretty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{ContentState, ErrorCode, ItemSerializer};

    fn store_with_versions() -> SqliteVersionStore {
        let store = SqliteVersionStore::in_memory().unwrap();
        for (index, state) in [(1, ContentState::Published), (2, ContentState::Draft)] {
            let mut item = ContentItem::new(format!("page v{}", index)).with_state(state);
            item.version_of = Some(ItemId(1));
            item.version_index = index;
            let blob = ItemSerializer::new().serialize(&item).unwrap();
            store
                .insert(&ContentVersion::from_snapshot(ItemId(1), &item, blob, "cli"))
                .unwrap();
        }
        store
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> serde_json::Value {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn test_history_lists_newest_first() {
        let store = store_with_versions();
        let json = output(|out| history(&store, 1, false, out));

        let indices: Vec<i64> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["version_index"].as_i64().unwrap())
            .collect();
        assert_eq!(indices, vec![2, 1]);
    }

    #[test]
    fn test_show_specific_index() {
        let store = store_with_versions();
        let json = output(|out| show(&store, 1, Some(1), true, out));
        assert_eq!(json["tree"]["title"], "page v1");
        assert_eq!(json["version"]["state"], "published");
    }

    #[test]
    fn test_show_missing_version_fails() {
        let store = store_with_versions();
        let mut buf = Vec::new();
        assert!(show(&store, 1, Some(9), false, &mut buf).is_err());
        assert!(show(&store, 2, None, false, &mut buf).is_err());
    }

    #[test]
    fn test_draft() {
        let store = store_with_versions();
        let json = output(|out| draft(&store, 1, false, out));
        assert_eq!(json["version"]["version_index"], 2);

        let json = output(|out| draft(&store, 5, false, out));
        assert!(json.is_null());
    }

    #[test]
    fn test_open_store_requires_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = VersioningConfig {
            database_path: dir.path().join("typo.db"),
            ..VersioningConfig::default()
        };

        let err = open_store(&config).unwrap_err();
        let folio = err.downcast_ref::<FolioError>().unwrap();
        assert_eq!(folio.code(), ErrorCode::DbConnectionFailed);
        assert!(!config.database_path.exists());
    }

    #[test]
    fn test_open_store_rejects_in_memory() {
        assert!(open_store(&VersioningConfig::in_memory()).is_err());
    }
}
