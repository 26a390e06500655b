//! Relational store operations for memories.
//!
//! The `memories` table is the authoritative record; the vector index is a
//! derived view over it. Every read and write here is scoped by the owning
//! user id. Embeddings are persisted as raw f32 bytes so the index can be
//! re-derived without calling the embedding service again.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::journal::types::{EmotionAnalysis, Memory};

fn to_json(value: &[String]) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".into())
}

fn from_json(value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_default()
}

fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let secondary: String = row.get("emotion_secondary")?;
    let tags: String = row.get("tags")?;
    let user_tags: String = row.get("user_tags")?;
    let people: String = row.get("people")?;
    let valence: String = row.get("emotion_valence")?;
    let embedding: Vec<u8> = row.get("embedding")?;

    Ok(Memory {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        content: row.get("content")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        emotion: EmotionAnalysis {
            primary: row.get("emotion_primary")?,
            secondary: from_json(&secondary),
            intensity: row.get("emotion_intensity")?,
            // The CHECK constraint guarantees a known valence
            valence: valence.parse().unwrap_or(crate::journal::types::Valence::Neutral),
        },
        mood: row.get("mood")?,
        tags: from_json(&tags),
        user_tags: from_json(&user_tags),
        people: from_json(&people),
        location: row.get("location")?,
        weather: row.get("weather")?,
        is_private: row.get("is_private")?,
        audio_ref: row.get("audio_ref")?,
        image_ref: row.get("image_ref")?,
        embedding: embedding_from_bytes(&embedding),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const MEMORY_COLUMNS: &str = "id, user_id, content, title, summary, emotion_primary, \
     emotion_secondary, emotion_intensity, emotion_valence, mood, tags, user_tags, people, \
     location, weather, is_private, audio_ref, image_ref, embedding, created_at, updated_at";

/// Insert a fully-derived memory row.
pub fn insert(conn: &Connection, memory: &Memory) -> Result<()> {
    conn.execute(
        "INSERT INTO memories (id, user_id, content, title, summary, emotion_primary, \
         emotion_secondary, emotion_intensity, emotion_valence, mood, tags, user_tags, people, \
         location, weather, is_private, audio_ref, image_ref, embedding, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            memory.id,
            memory.user_id,
            memory.content,
            memory.title,
            memory.summary,
            memory.emotion.primary,
            to_json(&memory.emotion.secondary),
            memory.emotion.intensity,
            memory.emotion.valence.as_str(),
            memory.mood,
            to_json(&memory.tags),
            to_json(&memory.user_tags),
            to_json(&memory.people),
            memory.location,
            memory.weather,
            memory.is_private,
            memory.audio_ref,
            memory.image_ref,
            crate::index::embedding_to_bytes(&memory.embedding),
            memory.created_at,
            memory.updated_at,
        ],
    )?;
    Ok(())
}

/// Fetch a memory by id, scoped to its owning user.
pub fn get(conn: &Connection, id: &str, user_id: &str) -> Result<Memory> {
    let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id, user_id], row_to_memory)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("memory not found: {id}")))
}

/// Rewrite every mutable column of an existing memory row.
pub fn update(conn: &Connection, memory: &Memory) -> Result<()> {
    let rows = conn.execute(
        "UPDATE memories SET content = ?1, title = ?2, summary = ?3, emotion_primary = ?4, \
         emotion_secondary = ?5, emotion_intensity = ?6, emotion_valence = ?7, mood = ?8, \
         tags = ?9, user_tags = ?10, people = ?11, location = ?12, weather = ?13, \
         is_private = ?14, embedding = ?15, updated_at = ?16 \
         WHERE id = ?17 AND user_id = ?18",
        params![
            memory.content,
            memory.title,
            memory.summary,
            memory.emotion.primary,
            to_json(&memory.emotion.secondary),
            memory.emotion.intensity,
            memory.emotion.valence.as_str(),
            memory.mood,
            to_json(&memory.tags),
            to_json(&memory.user_tags),
            to_json(&memory.people),
            memory.location,
            memory.weather,
            memory.is_private,
            crate::index::embedding_to_bytes(&memory.embedding),
            memory.updated_at,
            memory.id,
            memory.user_id,
        ],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(format!("memory not found: {}", memory.id)));
    }
    Ok(())
}

/// Delete a memory row. Errors with [`Error::NotFound`] when the id does
/// not exist for this user.
pub fn delete(conn: &Connection, id: &str, user_id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM memories WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(format!("memory not found: {id}")));
    }
    Ok(())
}

/// Batch-hydrate memories for the given ids, preserving the input order.
///
/// Ids missing from the store (index/store divergence) are silently dropped
/// from the result; the caller logs them. The user filter is applied again
/// here as defense in depth against an index scoping bug.
pub fn fetch_ordered(conn: &Connection, ids: &[String], user_id: &str) -> Result<Vec<Memory>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (2..=ids.len() + 1).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE user_id = ?1 AND id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut sql_params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
    for id in ids {
        sql_params.push(id);
    }

    let rows = stmt
        .query_map(sql_params.as_slice(), row_to_memory)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_id: HashMap<String, Memory> = rows.into_iter().map(|m| (m.id.clone(), m)).collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// The user's most recent memories, newest first.
pub fn list_recent(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<Memory>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE user_id = ?1 \
         ORDER BY created_at DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, limit as i64], row_to_memory)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every memory for a user (used by index reconciliation).
pub fn list_all(conn: &Connection, user_id: &str) -> Result<Vec<Memory>> {
    let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE user_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id], row_to_memory)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// True when any memory of this user references the given person id.
pub fn references_person(conn: &Connection, user_id: &str, person_id: &str) -> Result<bool> {
    // people is a JSON array of ids; a LIKE match on the quoted id is
    // sufficient because ids are UUIDs and cannot be substrings of each other.
    let pattern = format!("%\"{person_id}\"%");
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE user_id = ?1 AND people LIKE ?2",
        params![user_id, pattern],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::journal::types::Valence;

    const DIMS: usize = 8;

    fn test_db() -> Connection {
        db::open_memory_database(DIMS).unwrap()
    }

    fn sample(id: &str, user: &str) -> Memory {
        let now = chrono::Utc::now().to_rfc3339();
        Memory {
            id: id.to_string(),
            user_id: user.to_string(),
            content: "Had coffee with Alex".into(),
            title: Some("Coffee".into()),
            summary: "Coffee with a friend".into(),
            emotion: EmotionAnalysis {
                primary: "joy".into(),
                secondary: vec!["gratitude".into()],
                intensity: 7,
                valence: Valence::Positive,
            },
            mood: 8,
            tags: vec!["friends".into()],
            user_tags: vec!["friends".into()],
            people: vec!["person-1".into()],
            location: None,
            weather: None,
            is_private: false,
            audio_ref: None,
            image_ref: None,
            embedding: vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = test_db();
        let memory = sample("m1", "u1");
        insert(&conn, &memory).unwrap();

        let fetched = get(&conn, "m1", "u1").unwrap();
        assert_eq!(fetched.content, memory.content);
        assert_eq!(fetched.emotion.primary, "joy");
        assert_eq!(fetched.emotion.valence, Valence::Positive);
        assert_eq!(fetched.emotion.secondary, vec!["gratitude"]);
        assert_eq!(fetched.tags, vec!["friends"]);
        assert_eq!(fetched.people, vec!["person-1"]);
        assert_eq!(fetched.embedding, memory.embedding);
    }

    #[test]
    fn get_is_scoped_to_user() {
        let conn = test_db();
        insert(&conn, &sample("m1", "u1")).unwrap();

        let err = get(&conn, "m1", "u2").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn update_rewrites_derived_fields() {
        let conn = test_db();
        let mut memory = sample("m1", "u1");
        insert(&conn, &memory).unwrap();

        memory.content = "Had tea with Alex".into();
        memory.summary = "Tea instead".into();
        memory.mood = 6;
        memory.embedding = vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        update(&conn, &memory).unwrap();

        let fetched = get(&conn, "m1", "u1").unwrap();
        assert_eq!(fetched.content, "Had tea with Alex");
        assert_eq!(fetched.summary, "Tea instead");
        assert_eq!(fetched.mood, 6);
        assert_eq!(fetched.embedding[1], 1.0);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let conn = test_db();
        let memory = sample("ghost", "u1");
        assert!(matches!(update(&conn, &memory), Err(Error::NotFound(_))));
    }

    #[test]
    fn delete_scoped_and_not_found() {
        let conn = test_db();
        insert(&conn, &sample("m1", "u1")).unwrap();

        // Wrong user cannot delete
        assert!(matches!(delete(&conn, "m1", "u2"), Err(Error::NotFound(_))));
        delete(&conn, "m1", "u1").unwrap();
        assert!(matches!(delete(&conn, "m1", "u1"), Err(Error::NotFound(_))));
    }

    #[test]
    fn fetch_ordered_preserves_input_order_and_drops_missing() {
        let conn = test_db();
        insert(&conn, &sample("m1", "u1")).unwrap();
        insert(&conn, &sample("m2", "u1")).unwrap();
        insert(&conn, &sample("other", "u2")).unwrap();

        let ids = vec![
            "m2".to_string(),
            "missing".to_string(),
            "m1".to_string(),
            "other".to_string(), // belongs to u2 — dropped by the user filter
        ];
        let fetched = fetch_ordered(&conn, &ids, "u1").unwrap();
        let got: Vec<&str> = fetched.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(got, vec!["m2", "m1"]);
    }

    #[test]
    fn list_recent_orders_newest_first() {
        let conn = test_db();
        let mut old = sample("old", "u1");
        old.created_at = "2026-01-01T00:00:00Z".into();
        let mut new = sample("new", "u1");
        new.created_at = "2026-02-01T00:00:00Z".into();
        insert(&conn, &old).unwrap();
        insert(&conn, &new).unwrap();

        let recent = list_recent(&conn, "u1", 10).unwrap();
        assert_eq!(recent[0].id, "new");
        assert_eq!(recent[1].id, "old");

        let capped = list_recent(&conn, "u1", 1).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn references_person_detects_mentions() {
        let conn = test_db();
        insert(&conn, &sample("m1", "u1")).unwrap();

        assert!(references_person(&conn, "u1", "person-1").unwrap());
        assert!(!references_person(&conn, "u1", "person-2").unwrap());
        // Other users' memories don't count
        assert!(!references_person(&conn, "u2", "person-1").unwrap());
    }
}
