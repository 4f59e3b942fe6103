//! Assignment join table between schedule items and workers.

use rusqlite::{params, Connection};

use super::DatabaseError;
use crate::model::Assignment;

/// Replaces the full assignee set of an item.
pub fn replace_for_item(
    conn: &Connection,
    item_id: &str,
    assignees: &[Assignment],
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM schedule_item_assignees WHERE item_id = ?1",
        params![item_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO schedule_item_assignees (item_id, worker_id, hours_per_day)
         VALUES (?1, ?2, ?3)",
    )?;
    for assignee in assignees {
        stmt.execute(params![item_id, assignee.worker_id, assignee.hours_per_day])?;
    }
    Ok(())
}

/// Lists an item's assignees ordered by worker ID.
pub fn list_for_item(conn: &Connection, item_id: &str) -> Result<Vec<Assignment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT worker_id, hours_per_day FROM schedule_item_assignees
         WHERE item_id = ?1 ORDER BY worker_id",
    )?;
    let rows = stmt
        .query_map(params![item_id], |r| {
            Ok(Assignment {
                worker_id: r.get(0)?,
                hours_per_day: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
