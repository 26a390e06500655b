//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`]. The embedding
//! dimension is also stamped here so a database cannot be reopened with a
//! mismatched vector width.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stamped embedding dimension, if any.
pub fn get_embedding_dims(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_dims'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(val.parse::<usize>().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Stamp the embedding dimension this database was created with.
pub fn set_embedding_dims(conn: &Connection, dims: usize) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_dims', ?1)",
        [dims.to_string()],
    )?;
    Ok(())
}

/// Run all pending migrations. No-op when the database is current.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;

    while version < CURRENT_SCHEMA_VERSION {
        match version {
            // Future migrations slot in here as numbered steps.
            _ => {}
        }
        version += 1;
        update_schema_version(conn, version)?;
        tracing::info!(version, "schema migrated");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> Connection {
        db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        db::schema::init_schema(&conn, 8).unwrap();
        conn
    }

    #[test]
    fn fresh_db_is_at_current_version() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn embedding_dims_round_trip() {
        let conn = test_conn();
        assert_eq!(get_embedding_dims(&conn).unwrap(), None);
        set_embedding_dims(&conn, 1536).unwrap();
        assert_eq!(get_embedding_dims(&conn).unwrap(), Some(1536));
    }
}
