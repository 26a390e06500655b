//! Nudge persistence.
//!
//! Listing filters out expired nudges at read time; expired rows stay in
//! the table (nothing prunes them yet, deletion is explicit). The read and
//! actioned flags only ever move from false to true.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::journal::types::{Nudge, NudgePriority, NudgeType};

fn row_to_nudge(row: &Row<'_>) -> rusqlite::Result<Nudge> {
    let nudge_type: String = row.get("nudge_type")?;
    let priority: String = row.get("priority")?;
    let related_people: String = row.get("related_people")?;
    let related_memories: String = row.get("related_memories")?;

    Ok(Nudge {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        // CHECK constraints guarantee known values
        nudge_type: nudge_type.parse().unwrap_or(NudgeType::LogMemory),
        priority: priority.parse().unwrap_or(NudgePriority::Low),
        title: row.get("title")?,
        message: row.get("message")?,
        related_people: serde_json::from_str(&related_people).unwrap_or_default(),
        related_memories: serde_json::from_str(&related_memories).unwrap_or_default(),
        is_read: row.get("is_read")?,
        is_actioned: row.get("is_actioned")?,
        expires_at: row.get("expires_at")?,
        created_at: row.get("created_at")?,
    })
}

const NUDGE_COLUMNS: &str = "id, user_id, nudge_type, priority, title, message, \
     related_people, related_memories, is_read, is_actioned, expires_at, created_at";

pub fn insert(conn: &Connection, nudge: &Nudge) -> Result<()> {
    conn.execute(
        "INSERT INTO nudges (id, user_id, nudge_type, priority, title, message, \
         related_people, related_memories, is_read, is_actioned, expires_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            nudge.id,
            nudge.user_id,
            nudge.nudge_type.as_str(),
            nudge.priority.as_str(),
            nudge.title,
            nudge.message,
            serde_json::to_string(&nudge.related_people).unwrap_or_else(|_| "[]".into()),
            serde_json::to_string(&nudge.related_memories).unwrap_or_else(|_| "[]".into()),
            nudge.is_read,
            nudge.is_actioned,
            nudge.expires_at,
            nudge.created_at,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &str, user_id: &str) -> Result<Nudge> {
    let sql = format!("SELECT {NUDGE_COLUMNS} FROM nudges WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id, user_id], row_to_nudge)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("nudge not found: {id}")))
}

/// Active nudges for a user, newest first. Excludes expired ones and,
/// when `unread_only` is set, anything already read.
pub fn list_active(
    conn: &Connection,
    user_id: &str,
    now: &str,
    unread_only: bool,
) -> Result<Vec<Nudge>> {
    let mut sql = format!(
        "SELECT {NUDGE_COLUMNS} FROM nudges \
         WHERE user_id = ?1 AND (expires_at IS NULL OR expires_at > ?2)"
    );
    if unread_only {
        sql.push_str(" AND is_read = 0");
    }
    sql.push_str(" ORDER BY created_at DESC, id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, now], row_to_nudge)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Flip `is_read` to true. Repeated calls are no-ops, never a reset.
pub fn mark_read(conn: &Connection, id: &str, user_id: &str) -> Result<()> {
    set_flag(conn, id, user_id, "is_read")
}

/// Flip `is_actioned` to true (and implicitly `is_read`).
pub fn mark_actioned(conn: &Connection, id: &str, user_id: &str) -> Result<()> {
    set_flag(conn, id, user_id, "is_actioned")?;
    set_flag(conn, id, user_id, "is_read")
}

fn set_flag(conn: &Connection, id: &str, user_id: &str, column: &str) -> Result<()> {
    let sql = format!("UPDATE nudges SET {column} = 1 WHERE id = ?1 AND user_id = ?2");
    let rows = conn.execute(&sql, params![id, user_id])?;
    if rows == 0 {
        return Err(Error::NotFound(format!("nudge not found: {id}")));
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: &str, user_id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM nudges WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(format!("nudge not found: {id}")));
    }
    Ok(())
}
