//! Default publishing workflow state transitions.

use chrono::Utc;
use tracing::debug;

use crate::traits::StateChanger;
use crate::types::{ContentItem, ContentState};

/// State changer used by the editing workflow.
///
/// Publishing stamps `published` when the item has never been published,
/// unpublishing stamps `expires`. Clones of published or unpublished items
/// become drafts, every other clone keeps its original state.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowStateChanger;

impl StateChanger for WorkflowStateChanger {
    fn change_to(&self, item: &mut ContentItem, state: ContentState) {
        if item.state == state {
            return;
        }
        debug!(title = %item.title, from = %item.state, to = %state, "changing item state");

        let now = Utc::now();
        match state {
            ContentState::Published => {
                if item.published.is_none() {
                    item.published = Some(now);
                }
                item.expires = None;
            }
            ContentState::Unpublished => {
                item.expires = Some(now);
            }
            _ => {}
        }
        item.state = state;
    }

    fn on_cloned(&self, original: &ContentItem, clone: &mut ContentItem) {
        if matches!(
            original.state,
            ContentState::Published | ContentState::Unpublished
        ) {
            self.change_to(clone, ContentState::Draft);
        }
    }
}
