//! SQL DDL for all keepsake tables.
//!
//! Defines the `memories`, `people`, `nudges`, `index_entries`,
//! `memories_vec` (vec0), and `schema_meta` tables. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for the relational tables.
const SCHEMA_SQL: &str = r#"
-- Authoritative memory storage
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    title TEXT,
    summary TEXT NOT NULL,
    emotion_primary TEXT NOT NULL,
    emotion_secondary TEXT NOT NULL DEFAULT '[]',
    emotion_intensity INTEGER NOT NULL CHECK(emotion_intensity BETWEEN 1 AND 10),
    emotion_valence TEXT NOT NULL CHECK(emotion_valence IN ('positive','negative','neutral')),
    mood INTEGER NOT NULL CHECK(mood BETWEEN 1 AND 10),
    tags TEXT NOT NULL DEFAULT '[]',
    user_tags TEXT NOT NULL DEFAULT '[]',
    people TEXT NOT NULL DEFAULT '[]',
    location TEXT,
    weather TEXT,
    is_private INTEGER NOT NULL DEFAULT 0,
    audio_ref TEXT,
    image_ref TEXT,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
CREATE INDEX IF NOT EXISTS idx_memories_user_created ON memories(user_id, created_at);

-- Contacts referenced by memories
CREATE TABLE IF NOT EXISTS people (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    relationship TEXT,
    avatar_ref TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_people_user_name
    ON people(user_id, name COLLATE NOCASE);

-- Generated suggestions
CREATE TABLE IF NOT EXISTS nudges (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    nudge_type TEXT NOT NULL CHECK(nudge_type IN ('reconnect','log_memory','emotional_gap','person_reminder')),
    priority TEXT NOT NULL CHECK(priority IN ('low','medium','high')),
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    related_people TEXT NOT NULL DEFAULT '[]',
    related_memories TEXT NOT NULL DEFAULT '[]',
    is_read INTEGER NOT NULL DEFAULT 0,
    is_actioned INTEGER NOT NULL DEFAULT 0,
    expires_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nudges_user ON nudges(user_id);

-- Denormalized projection backing the vector index (one row per vec entry)
CREATE TABLE IF NOT EXISTS index_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    summary TEXT NOT NULL,
    title TEXT,
    people TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '',
    mood INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_user ON index_entries(user_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// vec0 virtual table must be created separately (sqlite-vec syntax), and
/// the embedding width is fixed at creation time from config.
fn vec_table_sql(dims: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec USING vec0(\n\
         id TEXT PRIMARY KEY,\n\
         embedding FLOAT[{dims}]\n\
         );"
    )
}

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection, embedding_dims: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(&vec_table_sql(embedding_dims))?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
