//! Template repository — the `task_templates` and `task_template_aliases` tables.
//!
//! Keys and aliases are stored upper-cased; callers normalize before lookup.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::model::TaskTemplate;

fn from_row(row: &Row<'_>) -> Result<TaskTemplate, rusqlite::Error> {
    Ok(TaskTemplate {
        key: row.get("key")?,
        label: row.get("label")?,
        hours_per_unit: row.get("hours_per_unit")?,
        complexity_factor: row.get("complexity_factor")?,
        unit_label: row.get("unit_label")?,
        aliases: Vec::new(),
    })
}

fn load_aliases(conn: &Connection, key: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT alias FROM task_template_aliases WHERE template_key = ?1 ORDER BY alias",
    )?;
    let aliases = stmt
        .query_map(params![key], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(aliases)
}

/// Inserts or replaces a template and its full alias set.
pub fn upsert(conn: &Connection, template: &TaskTemplate) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO task_templates (key, label, hours_per_unit, complexity_factor, unit_label)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(key) DO UPDATE SET label = ?2, hours_per_unit = ?3,
           complexity_factor = ?4, unit_label = ?5",
        params![
            template.key,
            template.label,
            template.hours_per_unit,
            template.complexity_factor,
            template.unit_label,
        ],
    )?;
    conn.execute(
        "DELETE FROM task_template_aliases WHERE template_key = ?1",
        params![template.key],
    )?;
    for alias in &template.aliases {
        conn.execute(
            "INSERT INTO task_template_aliases (alias, template_key) VALUES (?1, ?2)
             ON CONFLICT(alias) DO UPDATE SET template_key = ?2",
            params![alias, template.key],
        )?;
    }
    Ok(())
}

/// Finds a template by key, falling back to the alias table.
pub fn find_by_key(conn: &Connection, key: &str) -> Result<Option<TaskTemplate>, DatabaseError> {
    let direct = conn
        .query_row(
            "SELECT * FROM task_templates WHERE key = ?1",
            params![key],
            from_row,
        )
        .optional()?;

    let found = match direct {
        Some(t) => Some(t),
        None => conn
            .query_row(
                "SELECT t.* FROM task_templates t
                 JOIN task_template_aliases a ON a.template_key = t.key
                 WHERE a.alias = ?1",
                params![key],
                from_row,
            )
            .optional()?,
    };

    match found {
        Some(mut template) => {
            template.aliases = load_aliases(conn, &template.key)?;
            Ok(Some(template))
        }
        None => Ok(None),
    }
}

/// Lists all templates ordered by key.
pub fn list(conn: &Connection) -> Result<Vec<TaskTemplate>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM task_templates ORDER BY key")?;
    let mut templates = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for template in &mut templates {
        template.aliases = load_aliases(conn, &template.key)?;
    }
    Ok(templates)
}
