//! Schedule item repository — CRUD and overlap queries for `schedule_items`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{assignee_repo, format_timestamp, parse_optional_timestamp, parse_timestamp, DatabaseError};
use crate::model::{ItemStatus, Project, ScheduleItem, Worker};

/// A raw schedule item row from the database.
#[derive(Debug, Clone)]
struct ItemRow {
    id: String,
    schedule_id: String,
    position: u32,
    title: String,
    description: Option<String>,
    unit: Option<String>,
    quantity: Option<f64>,
    template_key: Option<String>,
    planned_start: Option<String>,
    planned_end: Option<String>,
    status: String,
    estimated_hours: f64,
    percent_complete: f64,
    has_conflict: bool,
    conflict_note: Option<String>,
    archived: bool,
    created_at: String,
    updated_at: String,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            schedule_id: row.get("schedule_id")?,
            position: row.get("position")?,
            title: row.get("title")?,
            description: row.get("description")?,
            unit: row.get("unit")?,
            quantity: row.get("quantity")?,
            template_key: row.get("template_key")?,
            planned_start: row.get("planned_start")?,
            planned_end: row.get("planned_end")?,
            status: row.get("status")?,
            estimated_hours: row.get("estimated_hours")?,
            percent_complete: row.get("percent_complete")?,
            has_conflict: row.get("has_conflict")?,
            conflict_note: row.get("conflict_note")?,
            archived: row.get("archived")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_item(self, conn: &Connection) -> Result<ScheduleItem, DatabaseError> {
        let status = ItemStatus::parse(&self.status).ok_or_else(|| DatabaseError::Corrupt {
            table: "schedule_items",
            id: self.id.clone(),
            reason: format!("unknown status '{}'", self.status),
        })?;
        let id = self.id.as_str();
        Ok(ScheduleItem {
            planned_start: parse_optional_timestamp("schedule_items", id, self.planned_start.as_deref())?,
            planned_end: parse_optional_timestamp("schedule_items", id, self.planned_end.as_deref())?,
            created_at: parse_timestamp("schedule_items", id, &self.created_at)?,
            updated_at: parse_timestamp("schedule_items", id, &self.updated_at)?,
            assignees: assignee_repo::list_for_item(conn, id)?,
            status,
            id: self.id,
            schedule_id: self.schedule_id,
            position: self.position,
            title: self.title,
            description: self.description,
            unit: self.unit,
            quantity: self.quantity,
            template_key: self.template_key,
            estimated_hours: self.estimated_hours,
            percent_complete: self.percent_complete,
            has_conflict: self.has_conflict,
            conflict_note: self.conflict_note,
            archived: self.archived,
        })
    }
}

/// Inserts a new item row together with its assignees.
pub fn insert(conn: &Connection, item: &ScheduleItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO schedule_items (id, schedule_id, position, title, description, unit, quantity,
         template_key, planned_start, planned_end, status, estimated_hours, percent_complete,
         has_conflict, conflict_note, archived, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            item.id,
            item.schedule_id,
            item.position,
            item.title,
            item.description,
            item.unit,
            item.quantity,
            item.template_key,
            item.planned_start.map(format_timestamp),
            item.planned_end.map(format_timestamp),
            item.status.as_str(),
            item.estimated_hours,
            item.percent_complete,
            item.has_conflict,
            item.conflict_note,
            item.archived,
            format_timestamp(item.created_at),
            format_timestamp(item.updated_at),
        ],
    )?;
    assignee_repo::replace_for_item(conn, &item.id, &item.assignees)
}

/// Updates an existing item row and replaces its assignees.
/// All fields except `id`, `schedule_id` and `created_at` are overwritten.
pub fn update(conn: &Connection, item: &ScheduleItem) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE schedule_items SET position=?2, title=?3, description=?4, unit=?5, quantity=?6,
         template_key=?7, planned_start=?8, planned_end=?9, status=?10, estimated_hours=?11,
         percent_complete=?12, has_conflict=?13, conflict_note=?14, archived=?15, updated_at=?16
         WHERE id=?1",
        params![
            item.id,
            item.position,
            item.title,
            item.description,
            item.unit,
            item.quantity,
            item.template_key,
            item.planned_start.map(format_timestamp),
            item.planned_end.map(format_timestamp),
            item.status.as_str(),
            item.estimated_hours,
            item.percent_complete,
            item.has_conflict,
            item.conflict_note,
            item.archived,
            format_timestamp(item.updated_at),
        ],
    )?;
    assignee_repo::replace_for_item(conn, &item.id, &item.assignees)
}

/// Finds an item by its ID, archived or not.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ScheduleItem>, DatabaseError> {
    conn.query_row(
        "SELECT * FROM schedule_items WHERE id = ?1",
        params![id],
        ItemRow::from_row,
    )
    .optional()?
    .map(|row| row.into_item(conn))
    .transpose()
}

/// Lists the items of a schedule in position order.
pub fn list_for_schedule(
    conn: &Connection,
    schedule_id: &str,
    include_archived: bool,
) -> Result<Vec<ScheduleItem>, DatabaseError> {
    let sql = if include_archived {
        "SELECT * FROM schedule_items WHERE schedule_id = ?1 ORDER BY position, id"
    } else {
        "SELECT * FROM schedule_items WHERE schedule_id = ?1 AND archived = 0 ORDER BY position, id"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![schedule_id], ItemRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| row.into_item(conn)).collect()
}

/// Deletes an item row. Assignees cascade; progress reports block the delete.
pub fn delete(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM schedule_items WHERE id = ?1", params![id])?;
    Ok(())
}

/// Marks an item as removed from its schedule while keeping its history.
pub fn archive(conn: &Connection, id: &str, updated_at: DateTime<Utc>) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE schedule_items SET archived = 1, updated_at = ?2 WHERE id = ?1",
        params![id, format_timestamp(updated_at)],
    )?;
    Ok(())
}

/// Sets the conflict flag and note. Dates and assignees are never touched.
pub fn set_conflict(
    conn: &Connection,
    id: &str,
    note: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE schedule_items SET has_conflict = 1, conflict_note = ?2, updated_at = ?3
         WHERE id = ?1",
        params![id, note, format_timestamp(updated_at)],
    )?;
    if changed == 0 {
        return Err(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
    }
    Ok(())
}

/// Writes the progress projection (current percent and status).
pub fn update_projection(
    conn: &Connection,
    id: &str,
    percent: f64,
    status: ItemStatus,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE schedule_items SET percent_complete = ?2, status = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, percent, status.as_str(), format_timestamp(updated_at)],
    )?;
    Ok(())
}

/// An item on another project that shares workers with a candidate range.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignBooking {
    pub item_id: String,
    pub item_title: String,
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub project: Project,
    /// Workers booked on both sides.
    pub shared_workers: Vec<Worker>,
}

/// Finds live, unfinished items on other projects that book any of
/// `worker_ids` within `[start, end]` (inclusive on both ends).
pub fn find_overlapping(
    conn: &Connection,
    worker_ids: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_project_id: &str,
) -> Result<Vec<ForeignBooking>, DatabaseError> {
    if worker_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (0..worker_ids.len()).map(|i| format!("?{}", i + 4)).collect();
    let sql = format!(
        "SELECT si.id, si.title, si.planned_start, si.planned_end,
                p.id, p.number, p.name, p.owner_id, w.id, w.display_name
         FROM schedule_items si
         JOIN schedules s ON s.id = si.schedule_id
         JOIN projects p ON p.id = s.project_id
         JOIN schedule_item_assignees a ON a.item_id = si.id
         JOIN workers w ON w.id = a.worker_id
         WHERE s.project_id != ?1
           AND si.status != ?2
           AND si.archived = 0
           AND si.planned_start IS NOT NULL AND si.planned_end IS NOT NULL
           AND si.planned_start <= ?3 AND si.planned_end >= ?{start_idx}
           AND a.worker_id IN ({})
         ORDER BY si.planned_start, si.id, w.id",
        placeholders.join(", "),
        start_idx = worker_ids.len() + 4,
    );

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(exclude_project_id.to_string()),
        Box::new(ItemStatus::Done.as_str()),
        Box::new(format_timestamp(end)),
    ];
    for id in worker_ids {
        param_values.push(Box::new(id.clone()));
    }
    param_values.push(Box::new(format_timestamp(start)));

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_ref.as_slice(), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                Project {
                    id: r.get(4)?,
                    number: r.get(5)?,
                    name: r.get(6)?,
                    owner_id: r.get(7)?,
                },
                Worker {
                    id: r.get(8)?,
                    display_name: r.get(9)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // One row per (item, shared worker); fold into one booking per item.
    let mut bookings: Vec<ForeignBooking> = Vec::new();
    for (item_id, title, start, end, project, worker) in rows {
        if let Some(last) = bookings.last_mut() {
            if last.item_id == item_id {
                last.shared_workers.push(worker);
                continue;
            }
        }
        bookings.push(ForeignBooking {
            planned_start: parse_timestamp("schedule_items", &item_id, &start)?,
            planned_end: parse_timestamp("schedule_items", &item_id, &end)?,
            item_id,
            item_title: title,
            project,
            shared_workers: vec![worker],
        });
    }
    Ok(bookings)
}
