//! Quote repository — read access to quotes and their lines.

use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp, DatabaseError};
use crate::model::{Quote, QuoteLine};

/// Inserts a quote header.
pub fn insert_quote(conn: &Connection, quote: &Quote) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO quotes (id, project_id, number, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            quote.id,
            quote.project_id,
            quote.number,
            format_timestamp(quote.created_at),
        ],
    )?;
    Ok(())
}

/// Inserts a quote line.
pub fn insert_line(conn: &Connection, line: &QuoteLine) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO quote_lines (id, quote_id, position, title, description, unit, quantity, template_key)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            line.id,
            line.quote_id,
            line.position,
            line.title,
            line.description,
            line.unit,
            line.quantity,
            line.template_key,
        ],
    )?;
    Ok(())
}

/// Finds the most recent quote for a project.
pub fn find_latest_for_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Option<Quote>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, project_id, number, created_at FROM quotes
             WHERE project_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
            params![project_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, project_id, number, created_at)| {
        let created_at = parse_timestamp("quotes", &id, &created_at)?;
        Ok(Quote {
            id,
            project_id,
            number,
            created_at,
        })
    })
    .transpose()
}

/// Lists a quote's lines in position order.
pub fn lines_for_quote(conn: &Connection, quote_id: &str) -> Result<Vec<QuoteLine>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, quote_id, position, title, description, unit, quantity, template_key
         FROM quote_lines WHERE quote_id = ?1 ORDER BY position, id",
    )?;
    let lines = stmt
        .query_map(params![quote_id], |r| {
            Ok(QuoteLine {
                id: r.get(0)?,
                quote_id: r.get(1)?,
                position: r.get(2)?,
                title: r.get(3)?,
                description: r.get(4)?,
                unit: r.get(5)?,
                quantity: r.get(6)?,
                template_key: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines)
}
