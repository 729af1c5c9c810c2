//! Core types for folio.

mod detail;
mod item;
mod state;

pub use detail::{DetailCollection, DetailType, DetailValue};
pub use item::*;
pub use state::ContentState;
