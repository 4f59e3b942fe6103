//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order. Column additions are handled conditionally
//! so databases created by older builds upgrade in place.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
    kind: MigrationKind,
}

enum MigrationKind {
    /// Execute the SQL directly.
    Standard,
    /// Adds a column unless it is already present.
    AddColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_projects_and_workers",
        sql: include_str!("sql/001_create_projects_and_workers.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 2,
        description: "create_task_templates",
        sql: include_str!("sql/002_create_task_templates.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 3,
        description: "create_quotes",
        sql: include_str!("sql/003_create_quotes.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 4,
        description: "create_schedules",
        sql: include_str!("sql/004_create_schedules.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 5,
        description: "create_progress_reports",
        sql: include_str!("sql/005_create_progress_reports.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 6,
        description: "create_notifications",
        sql: include_str!("sql/006_create_notifications.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 7,
        description: "add_archived_to_schedule_items",
        sql: include_str!("sql/007_add_archived_to_schedule_items.sql"),
        kind: MigrationKind::AddColumn {
            table: "schedule_items",
            column: "archived",
        },
    },
];

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// Brings the schema up to the latest version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(LEDGER_DDL)?;

    let applied: u32 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |r| {
        r.get(0)
    })?;

    MIGRATIONS
        .iter()
        .filter(|m| m.version > applied)
        .try_for_each(|m| apply(conn, m))
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let needed = match migration.kind {
        MigrationKind::Standard => true,
        MigrationKind::AddColumn { table, column } => !column_exists(conn, table, column)?,
    };

    if needed {
        log::info!("Applying migration {:03} ({})", migration.version, migration.description);
        conn.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;
    } else {
        log::debug!("Migration {:03} already satisfied", migration.version);
    }

    conn.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        params![migration.version, migration.description],
    )?;
    Ok(())
}

/// Whether `table` has a column named `column`.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        conn
    }

    #[test]
    fn test_rerun_records_each_version_once() {
        let conn = fresh();
        for _ in 0..2 {
            run_all(&conn).unwrap();
            let versions: Vec<u32> = conn
                .prepare("SELECT version FROM _migrations ORDER BY version")
                .unwrap()
                .query_map([], |r| r.get(0))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(versions, (1..=MIGRATIONS.len() as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_column_exists_check() {
        let conn = fresh();
        conn.execute_batch("CREATE TABLE crews (id TEXT, foreman TEXT);")
            .unwrap();

        assert!(column_exists(&conn, "crews", "foreman").unwrap());
        assert!(!column_exists(&conn, "crews", "size").unwrap());
        assert!(!column_exists(&conn, "no_such_table", "id").unwrap());
    }

    #[test]
    fn test_schedule_items_have_archived_column() {
        let conn = fresh();
        run_all(&conn).unwrap();

        assert!(column_exists(&conn, "schedule_items", "archived").unwrap());
    }

    #[test]
    fn test_archived_column_skipped_when_present() {
        let conn = fresh();
        // Simulate a database that already carries the column from a manual fix.
        for migration in &MIGRATIONS[..4] {
            conn.execute_batch(migration.sql).unwrap();
        }
        conn.execute_batch(MIGRATIONS[6].sql).unwrap();

        run_all(&conn).unwrap();
        assert!(column_exists(&conn, "schedule_items", "archived").unwrap());
    }

    #[test]
    fn test_one_schedule_per_project() {
        let conn = fresh();
        run_all(&conn).unwrap();

        conn.execute(
            "INSERT INTO projects (id, number, name) VALUES ('p1', 'P-1', 'Mill')",
            [],
        )
        .unwrap();
        let insert = "INSERT INTO schedules (id, project_id, status, created_by, created_at, updated_at)
                      VALUES (?1, 'p1', 'draft', 'u1', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')";
        conn.execute(insert, ["s1"]).unwrap();
        assert!(conn.execute(insert, ["s2"]).is_err());
    }
}
