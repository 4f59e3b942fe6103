//! Broadcasting of conflict-detection outcomes.
//!
//! Conflict flags and notifications are best-effort side effects of a save;
//! publishing them here keeps their successes and failures observable
//! without coupling the save path to any particular consumer.

pub mod conflict_events;

pub use conflict_events::{ConflictBroadcaster, ConflictEvent};
