//! Collaborator traits consumed by the versioning core.

mod item_store;
mod state_changer;

pub use item_store::*;
pub use state_changer::*;
