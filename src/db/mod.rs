pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the journal database at the given path, with all
/// extensions loaded and schema initialized for `embedding_dims`-wide vectors.
///
/// The embedding dimension is stamped into `schema_meta` on first open;
/// opening with a different dimension later fails fast instead of silently
/// mixing vector spaces.
pub fn open_database(path: impl AsRef<Path>, embedding_dims: usize) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    schema::init_schema(&conn, embedding_dims).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    if let Some(stored) = migrations::get_embedding_dims(&conn)? {
        anyhow::ensure!(
            stored == embedding_dims,
            "database was created with {stored}-dimensional embeddings, \
             but config requests {embedding_dims}. Re-create the database or \
             fix ai.embedding_dimensions."
        );
    } else {
        migrations::set_embedding_dims(&conn, embedding_dims)?;
    }

    tracing::info!(path = %path.display(), dims = embedding_dims, "database initialized");
    Ok(conn)
}

/// Open an in-memory database for testing.
pub fn open_memory_database(embedding_dims: usize) -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn, embedding_dims).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    migrations::set_embedding_dims(&conn, embedding_dims)?;
    Ok(conn)
}
