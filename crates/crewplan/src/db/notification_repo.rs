//! Notification repository. The scheduler only appends; listing exists for
//! the inbox endpoint of the surrounding application.

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp, DatabaseError};
use crate::model::Notification;

/// Appends a notification.
pub fn insert(conn: &Connection, notification: &Notification) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO notifications (id, recipient_id, kind, message, link, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            notification.id,
            notification.recipient_id,
            notification.kind,
            notification.message,
            notification.link,
            format_timestamp(notification.created_at),
        ],
    )?;
    Ok(())
}

/// Lists a recipient's notifications, newest first.
pub fn list_for_recipient(
    conn: &Connection,
    recipient_id: &str,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, recipient_id, kind, message, link, created_at FROM notifications
         WHERE recipient_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map(params![recipient_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, recipient_id, kind, message, link, created_at)| {
            Ok(Notification {
                created_at: parse_timestamp("notifications", &id, &created_at)?,
                id,
                recipient_id,
                kind,
                message,
                link,
            })
        })
        .collect()
}
