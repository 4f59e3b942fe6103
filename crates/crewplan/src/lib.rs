pub mod api;
pub mod app;
pub mod broadcast;
pub mod caller;
pub mod catalog;
pub mod config;
pub mod conflict;
pub mod db;
pub mod error;
pub mod estimation;
pub mod model;
pub mod progress;
pub mod schedule;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use app::Crewplan;
pub use broadcast::{ConflictBroadcaster, ConflictEvent};
pub use caller::{Caller, CallerRole};
pub use catalog::Catalog;
pub use config::{load_config, Config};
pub use conflict::{ConflictDetector, ConflictSummary, SaveWarning};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, IssueKind, Result, SchedulingError, ValidationErrors, ValidationIssue};
pub use estimation::{Estimate, EstimateRequest};
pub use model::{Assignment, ItemStatus, ScheduleItem, ScheduleStatus};
pub use progress::{ProgressTracker, ScheduleProgress, SubmitProgress};
pub use schedule::{ItemInput, SaveOutcome, SaveScheduleRequest, ScheduleService};
