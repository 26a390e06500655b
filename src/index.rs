//! Vector index adapter over sqlite-vec.
//!
//! Stores one denormalized projection per memory: the embedding lives in the
//! `memories_vec` vec0 table, everything else (owning user, raw text,
//! summary, flattened metadata) in `index_entries`. The index is a derived,
//! eventually-consistent view — the `memories` table stays authoritative and
//! the index can always be re-derived from it.
//!
//! Embeddings are L2-normalized on write and on query, so the vec0 L2
//! distance converts exactly to cosine similarity via `1 - d²/2`.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::{Error, Result};

/// Flattened metadata carried alongside each index entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryMetadata {
    pub title: Option<String>,
    /// Comma-joined people names.
    pub people: String,
    /// Comma-joined tags.
    pub tags: String,
    pub mood: u8,
}

/// A denormalized projection of a memory, ready for insertion.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub summary: String,
    pub metadata: EntryMetadata,
    pub embedding: Vec<f32>,
}

/// One similarity-search hit.
#[derive(Debug, Clone, Serialize)]
pub struct IndexMatch {
    pub id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f64,
    pub content: String,
    pub summary: String,
    pub metadata: EntryMetadata,
}

/// Over-fetch factor for the global KNN pass: the nearest-neighbor scan is
/// not user-scoped, so we fetch extra candidates before filtering by owner.
/// When the filtered count still falls short of the limit, the scan widens
/// (see [`query`]) rather than under-returning.
const CANDIDATE_FACTOR: usize = 8;
const CANDIDATE_MIN: usize = 64;
const CANDIDATE_GROWTH: usize = 4;

fn index_err(e: rusqlite::Error) -> Error {
    Error::VectorIndex(e.to_string())
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// L2-normalize a vector. Zero vectors are returned unchanged.
pub fn l2_normalize(embedding: &[f32]) -> Vec<f32> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding.iter().map(|x| x / norm).collect()
    } else {
        embedding.to_vec()
    }
}

/// Convert an L2 distance between unit vectors to cosine similarity.
fn distance_to_similarity(distance: f64) -> f64 {
    (1.0 - (distance * distance) / 2.0).clamp(-1.0, 1.0)
}

/// Insert or replace the entry for `entry.id`.
///
/// Replacement is delete-then-insert. The pair is not atomic: a crash in
/// between leaves the id absent until the next successful write, which is
/// acceptable because the relational store remains authoritative and the
/// index can be re-driven from it.
pub fn upsert(conn: &Connection, entry: &IndexEntry) -> Result<()> {
    delete(conn, &entry.id)?;

    let normalized = l2_normalize(&entry.embedding);
    conn.execute(
        "INSERT INTO index_entries (id, user_id, content, summary, title, people, tags, mood) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.id,
            entry.user_id,
            entry.content,
            entry.summary,
            entry.metadata.title,
            entry.metadata.people,
            entry.metadata.tags,
            entry.metadata.mood,
        ],
    )
    .map_err(index_err)?;

    conn.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![entry.id, embedding_to_bytes(&normalized)],
    )
    .map_err(index_err)?;

    Ok(())
}

/// Delete the entry for `id`. Idempotent — deleting a non-existent id is
/// not an error.
pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])
        .map_err(index_err)?;
    conn.execute("DELETE FROM index_entries WHERE id = ?1", params![id])
        .map_err(index_err)?;
    Ok(())
}

/// Delete every entry owned by `user_id`.
pub fn delete_by_user(conn: &Connection, user_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM memories_vec WHERE id IN (SELECT id FROM index_entries WHERE user_id = ?1)",
        params![user_id],
    )
    .map_err(index_err)?;
    let removed = conn
        .execute("DELETE FROM index_entries WHERE user_id = ?1", params![user_id])
        .map_err(index_err)?;
    Ok(removed)
}

/// Similarity search scoped to `user_id`.
///
/// Returns at most `limit` entries with similarity ≥ `floor`, ordered by
/// descending similarity; equal scores are broken by ascending id so a
/// fixed index state always yields the same order.
///
/// The global KNN pass sees all users, so an index dominated by other
/// users' near matches could starve the caller's partition. The candidate
/// window grows geometrically until enough owned entries are found, the
/// floor is reached, or the index is exhausted.
pub fn query(
    conn: &Connection,
    embedding: &[f32],
    user_id: &str,
    limit: usize,
    floor: f64,
) -> Result<Vec<IndexMatch>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let normalized = l2_normalize(embedding);
    let mut candidate_limit = (limit * CANDIDATE_FACTOR).max(CANDIDATE_MIN);

    loop {
        // 1. Global KNN pass
        let mut stmt = conn
            .prepare(
                "SELECT id, distance FROM memories_vec \
                 WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
            )
            .map_err(index_err)?;
        let candidates: Vec<(String, f64)> = stmt
            .query_map(
                params![embedding_to_bytes(&normalized), candidate_limit as i64],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .map_err(index_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(index_err)?;
        let exhausted = candidates.len() < candidate_limit;

        // 2. Hydrate projections, enforcing the user partition
        let mut matches = Vec::new();
        let mut floor_reached = false;
        for (id, distance) in candidates {
            let similarity = distance_to_similarity(distance);
            if similarity < floor {
                // Candidates arrive in ascending distance order, so
                // everything after this point is below the floor too.
                floor_reached = true;
                break;
            }

            let row = conn
                .query_row(
                    "SELECT user_id, content, summary, title, people, tags, mood \
                     FROM index_entries WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, u8>(6)?,
                        ))
                    },
                )
                .map_err(index_err)?;

            let (owner, content, summary, title, people, tags, mood) = row;
            if owner != user_id {
                continue;
            }

            matches.push(IndexMatch {
                id,
                similarity,
                content,
                summary,
                metadata: EntryMetadata {
                    title,
                    people,
                    tags,
                    mood,
                },
            });
        }

        if matches.len() < limit && !floor_reached && !exhausted {
            // Other users crowded the window; widen and rescan.
            candidate_limit = candidate_limit.saturating_mul(CANDIDATE_GROWTH);
            continue;
        }

        // Descending similarity, ties broken by ascending id (deterministic
        // for a fixed index state).
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(limit);

        return Ok(matches);
    }
}
