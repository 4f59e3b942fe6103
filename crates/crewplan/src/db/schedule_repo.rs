//! Schedule repository — one `schedules` row per project.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, DatabaseError};
use crate::model::{Schedule, ScheduleStatus};

/// A raw schedule row from the database.
struct ScheduleRow {
    id: String,
    project_id: String,
    note: Option<String>,
    status: String,
    created_by: String,
    created_at: String,
    updated_at: String,
}

impl ScheduleRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            note: row.get("note")?,
            status: row.get("status")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_schedule(self) -> Result<Schedule, DatabaseError> {
        let status = ScheduleStatus::parse(&self.status).ok_or_else(|| DatabaseError::Corrupt {
            table: "schedules",
            id: self.id.clone(),
            reason: format!("unknown status '{}'", self.status),
        })?;
        Ok(Schedule {
            created_at: parse_timestamp("schedules", &self.id, &self.created_at)?,
            updated_at: parse_timestamp("schedules", &self.id, &self.updated_at)?,
            id: self.id,
            project_id: self.project_id,
            note: self.note,
            status,
            created_by: self.created_by,
        })
    }
}

/// Inserts a new schedule row.
pub fn insert(conn: &Connection, schedule: &Schedule) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO schedules (id, project_id, note, status, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            schedule.id,
            schedule.project_id,
            schedule.note,
            schedule.status.as_str(),
            schedule.created_by,
            format_timestamp(schedule.created_at),
            format_timestamp(schedule.updated_at),
        ],
    )?;
    Ok(())
}

/// Updates note, status and updated_at. Project and creator never change.
pub fn update(conn: &Connection, schedule: &Schedule) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE schedules SET note = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            schedule.id,
            schedule.note,
            schedule.status.as_str(),
            format_timestamp(schedule.updated_at),
        ],
    )?;
    Ok(())
}

/// Finds the schedule of a project.
pub fn find_by_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Option<Schedule>, DatabaseError> {
    conn.query_row(
        "SELECT * FROM schedules WHERE project_id = ?1",
        params![project_id],
        ScheduleRow::from_row,
    )
    .optional()?
    .map(ScheduleRow::into_schedule)
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{project_repo, Database};
    use crate::model::Project;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_insert_update_find() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            project_repo::upsert_project(
                conn,
                &Project {
                    id: "p1".to_string(),
                    number: "P-1".to_string(),
                    name: "Silo".to_string(),
                    owner_id: None,
                },
            )?;
            let at = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
            let mut schedule = Schedule {
                id: "s1".to_string(),
                project_id: "p1".to_string(),
                note: None,
                status: ScheduleStatus::Draft,
                created_by: "u1".to_string(),
                created_at: at,
                updated_at: at,
            };
            insert(conn, &schedule)?;

            schedule.status = ScheduleStatus::Active;
            schedule.note = Some("crew confirmed".to_string());
            update(conn, &schedule)?;

            let found = find_by_project(conn, "p1")?.unwrap();
            assert_eq!(found, schedule);
            assert!(find_by_project(conn, "p2")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_corrupt_status_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO projects (id, number, name) VALUES ('p1', 'P-1', 'Silo');
                 INSERT INTO schedules (id, project_id, status, created_by, created_at, updated_at)
                 VALUES ('s1', 'p1', 'frozen', 'u1', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z');",
            )?;
            find_by_project(conn, "p1")
        });
        assert!(matches!(result, Err(DatabaseError::Corrupt { .. })));
    }
}
