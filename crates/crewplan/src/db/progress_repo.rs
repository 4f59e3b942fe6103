//! Progress report repository — append-only.

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp, DatabaseError};
use crate::model::ProgressReport;

/// Appends a report.
pub fn insert(conn: &Connection, report: &ProgressReport) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO progress_reports (id, item_id, worker_id, percent, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            report.id,
            report.item_id,
            report.worker_id,
            report.percent,
            report.note,
            format_timestamp(report.created_at),
        ],
    )?;
    Ok(())
}

/// Lists an item's reports, newest first.
pub fn list_for_item(conn: &Connection, item_id: &str) -> Result<Vec<ProgressReport>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, item_id, worker_id, percent, note, created_at FROM progress_reports
         WHERE item_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map(params![item_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, f64>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, item_id, worker_id, percent, note, created_at)| {
            Ok(ProgressReport {
                created_at: parse_timestamp("progress_reports", &id, &created_at)?,
                id,
                item_id,
                worker_id,
                percent,
                note,
            })
        })
        .collect()
}

/// Counts the reports recorded against an item.
pub fn count_for_item(conn: &Connection, item_id: &str) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM progress_reports WHERE item_id = ?1",
        params![item_id],
        |r| r.get(0),
    )?;
    Ok(count)
}
