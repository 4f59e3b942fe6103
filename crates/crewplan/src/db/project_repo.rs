//! Project and worker lookups. Both tables are fed by the surrounding ERP.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::model::{Project, Worker};

fn project_from_row(row: &Row<'_>) -> Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get("id")?,
        number: row.get("number")?,
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
    })
}

/// Inserts or replaces a project row.
pub fn upsert_project(conn: &Connection, project: &Project) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO projects (id, number, name, owner_id) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET number = ?2, name = ?3, owner_id = ?4",
        params![project.id, project.number, project.name, project.owner_id],
    )?;
    Ok(())
}

/// Finds a project by its ID.
pub fn find_project(conn: &Connection, id: &str) -> Result<Option<Project>, DatabaseError> {
    let project = conn
        .query_row(
            "SELECT id, number, name, owner_id FROM projects WHERE id = ?1",
            params![id],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

/// Inserts or replaces a worker row.
pub fn upsert_worker(conn: &Connection, worker: &Worker) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO workers (id, display_name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET display_name = ?2",
        params![worker.id, worker.display_name],
    )?;
    Ok(())
}

/// Finds a worker by its ID.
pub fn find_worker(conn: &Connection, id: &str) -> Result<Option<Worker>, DatabaseError> {
    let worker = conn
        .query_row(
            "SELECT id, display_name FROM workers WHERE id = ?1",
            params![id],
            |row| {
                Ok(Worker {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(worker)
}

/// Returns the subset of `ids` that have no worker row.
pub fn missing_workers(conn: &Connection, ids: &[String]) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT 1 FROM workers WHERE id = ?1")?;
    let mut missing = Vec::new();
    for id in ids {
        if !stmt.exists(params![id])? {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}
