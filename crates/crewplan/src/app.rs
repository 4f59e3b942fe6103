//! Application state: one database handle shared by every service.

use std::path::PathBuf;

use crate::broadcast::ConflictBroadcaster;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::conflict::ConflictDetector;
use crate::db::{default_database_path, Database, DatabaseError};
use crate::progress::ProgressTracker;
use crate::schedule::ScheduleService;

#[derive(Clone)]
pub struct Crewplan {
    pub db: Database,
    pub catalog: Catalog,
    pub schedules: ScheduleService,
    pub progress: ProgressTracker,
    pub conflicts: ConflictBroadcaster,
}

impl Crewplan {
    /// Opens the configured database (or the default one under the home
    /// directory) and seeds the template catalog.
    pub fn open(config: &Config) -> Result<Self, DatabaseError> {
        let path = match &config.database_path {
            Some(path) => PathBuf::from(path),
            None => default_database_path().ok_or_else(|| DatabaseError::Io {
                path: PathBuf::from("~/.crewplan"),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not determine home directory",
                ),
            })?,
        };
        Self::with_database(Database::open(&path)?, config)
    }

    /// In-memory state for tests and throwaway sessions.
    pub fn in_memory(config: &Config) -> Result<Self, DatabaseError> {
        Self::with_database(Database::open_in_memory()?, config)
    }

    pub fn with_database(db: Database, config: &Config) -> Result<Self, DatabaseError> {
        let catalog = Catalog::new(db.clone());
        catalog.seed(&config.catalog)?;

        let conflicts = ConflictBroadcaster::default();
        let detector = ConflictDetector::new(db.clone(), config.conflicts.clone(), conflicts.clone());

        Ok(Self {
            catalog,
            schedules: ScheduleService::new(db.clone(), detector),
            progress: ProgressTracker::new(db.clone()),
            conflicts,
            db,
        })
    }
}
