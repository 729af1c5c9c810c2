//! Lifecycle states of content items.
//!
//! The state set is owned by the publishing workflow; the versioning core only
//! reads it. Only [`ContentState::Draft`] takes part in draft selection.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Lifecycle state of a content item or of the root of a version snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentState {
    /// No state assigned.
    #[default]
    None,
    /// Created but never saved through the workflow.
    New,
    /// Work in progress, not yet visible.
    Draft,
    /// Scheduled for publishing at a later time.
    Waiting,
    /// Live and visible.
    Published,
    /// Taken offline after having been published.
    Unpublished,
    /// Moved to trash.
    Deleted,
}

impl ContentState {
    /// Convert to string for storage.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether a version in this state is a draft candidate.
    pub fn is_draft(&self) -> bool {
        matches!(self, ContentState::Draft)
    }
}
