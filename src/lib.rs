//! Semantic memory for a personal journal — store, recall, and nudge.
//!
//! Keepsake keeps journal entries ("memories") in SQLite, enriches each one
//! with an AI-generated summary, emotion classification, and embedding, and
//! retrieves them by meaning rather than keywords. From the same store it
//! periodically generates gentle nudges: suggestions to reconnect with
//! someone, log an entry, or notice an emotional gap.
//!
//! # Architecture
//!
//! - **Storage**: SQLite; the `memories` table is authoritative, with
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) providing a derived
//!   vector index that can always be rebuilt from it
//! - **AI**: any OpenAI-compatible API for embeddings and chat completions,
//!   behind the [`ai::EmbeddingProvider`] and [`ai::ChatProvider`] traits
//! - **Retrieval**: embed the query, cosine KNN over the index, hydrate
//!   full records, then explain the matches in natural language
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, and migrations
//! - [`ai`] — External AI clients, prompts, and strict output validation
//! - [`index`] — Vector index adapter over sqlite-vec
//! - [`journal`] — Domain types and per-table store operations
//! - [`service`] — The orchestrator tying everything together

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod journal;
pub mod service;

pub use error::{Error, Result};
pub use service::MemoryService;
