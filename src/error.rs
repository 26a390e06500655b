//! Error taxonomy for the memory pipeline.
//!
//! Every external-service failure maps to a distinct variant so callers can
//! tell *which* collaborator broke without parsing upstream error text. An
//! empty search result is never an error — absence of matches is a valid
//! terminal state, not a failure.

use thiserror::Error;

/// Which stage of the retrieval pipeline failed.
///
/// The explain stage is deliberately absent: explanation is best-effort and
/// degrades to a generic string instead of failing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Embedding the query text.
    Embed,
    /// Vector index similarity search.
    Search,
    /// Fetching full records from the relational store.
    Hydrate,
}

impl std::fmt::Display for QueryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Embed => "embed",
            Self::Search => "search",
            Self::Hydrate => "hydrate",
        })
    }
}

/// All failures the core can surface to its callers.
#[derive(Debug, Error)]
pub enum Error {
    /// The embedding service failed or returned a malformed vector.
    #[error("embedding failure: {0}")]
    Embedding(String),

    /// The summarization call failed, or its reply violated the output
    /// schema (missing field, mood out of range, unknown valence).
    #[error("summarization failure: {0}")]
    Summarization(String),

    /// A vector index mutation or search failed.
    #[error("vector index failure: {0}")]
    VectorIndex(String),

    /// A relational store read or write failed.
    #[error("relational store failure: {0}")]
    RelationalStore(String),

    /// Nudge generation failed upstream — no partial nudge list exists.
    #[error("nudge generation failure: {0}")]
    NudgeGeneration(String),

    /// A retrieval query failed at the given stage.
    #[error("query failure at {stage} stage: {message}")]
    Query {
        stage: QueryStage,
        message: String,
    },

    /// The requested record does not exist (or belongs to another user).
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied input was rejected before any external call.
    #[error("validation failure: {0}")]
    Validation(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::RelationalStore(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_stage_display() {
        assert_eq!(QueryStage::Embed.to_string(), "embed");
        assert_eq!(QueryStage::Search.to_string(), "search");
        assert_eq!(QueryStage::Hydrate.to_string(), "hydrate");
    }

    #[test]
    fn query_error_names_its_stage() {
        let err = Error::Query {
            stage: QueryStage::Search,
            message: "index offline".into(),
        };
        let text = err.to_string();
        assert!(text.contains("search"));
        assert!(text.contains("index offline"));
    }

    #[test]
    fn sqlite_errors_map_to_relational_store() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::RelationalStore(_)));
    }
}
