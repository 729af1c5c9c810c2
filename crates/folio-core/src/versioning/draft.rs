//! Draft selection over version history.
//!
//! A draft is not stored separately: it is whichever draft-state version has
//! the greatest index. These functions select it from any sequence of
//! versions, in any order.

use std::cmp::Ordering;

use crate::error::FolioResult;
use crate::versioning::ContentVersion;

fn rank(a: &ContentVersion, b: &ContentVersion) -> Ordering {
    a.version_index
        .cmp(&b.version_index)
        .then_with(|| a.saved.cmp(&b.saved))
}

/// Pick the current draft: the draft-state version with the greatest
/// index, the most recently saved one if indices tie.
pub fn select_draft<I>(versions: I) -> FolioResult<Option<ContentVersion>>
where
    I: IntoIterator<Item = FolioResult<ContentVersion>>,
{
    let mut best: Option<ContentVersion> = None;
    for version in versions {
        let version = version?;
        if !version.is_draft() {
            continue;
        }
        match &best {
            Some(current) if rank(&version, current) != Ordering::Greater => {}
            _ => best = Some(version),
        }
    }
    Ok(best)
}

/// Whether any version in the sequence is a draft. Stops at the first one.
pub fn contains_draft<I>(versions: I) -> FolioResult<bool>
where
    I: IntoIterator<Item = FolioResult<ContentVersion>>,
{
    for version in versions {
        if version?.is_draft() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FolioError;
    use crate::types::{ContentItem, ContentState, ItemId};
    use chrono::Duration;

    fn version(index: i32, state: ContentState) -> ContentVersion {
        let mut item = ContentItem::new("page").with_state(state);
        item.version_index = index;
        ContentVersion::from_snapshot(ItemId(1), &item, String::new(), "tester")
    }

    #[test]
    fn test_greatest_index_wins_regardless_of_order() {
        let versions = vec![
            version(3, ContentState::Draft),
            version(5, ContentState::Draft),
            version(4, ContentState::Draft),
        ];
        let draft = select_draft(versions.into_iter().map(Ok)).unwrap().unwrap();
        assert_eq!(draft.version_index, 5);
    }

    #[test]
    fn test_non_drafts_are_ignored() {
        let versions = vec![
            version(9, ContentState::Published),
            version(2, ContentState::Draft),
            version(10, ContentState::Waiting),
        ];
        let draft = select_draft(versions.into_iter().map(Ok)).unwrap().unwrap();
        assert_eq!(draft.version_index, 2);
    }

    #[test]
    fn test_tie_goes_to_latest_save() {
        let mut older = version(3, ContentState::Draft);
        older.saved = older.saved - Duration::minutes(5);
        let newer = version(3, ContentState::Draft);
        let newer_id = newer.id;

        let draft = select_draft(vec![Ok(newer), Ok(older)]).unwrap().unwrap();
        assert_eq!(draft.id, newer_id);
    }

    #[test]
    fn test_no_drafts() {
        let versions = vec![
            version(1, ContentState::Published),
            version(2, ContentState::Deleted),
        ];
        assert!(!contains_draft(versions.clone().into_iter().map(Ok)).unwrap());
        assert!(select_draft(versions.into_iter().map(Ok)).unwrap().is_none());
    }

    #[test]
    fn test_errors_propagate() {
        let versions = vec![Err(FolioError::database("boom"))];
        assert!(select_draft(versions).is_err());
    }
}
