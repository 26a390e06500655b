//! Relational store layer: domain types and per-table operations.
//!
//! All functions here operate on a borrowed [`rusqlite::Connection`] and
//! are synchronous; [`crate::service::MemoryService`] owns the connection
//! and serializes access behind a mutex.

pub mod nudges;
pub mod people;
pub mod records;
pub mod types;
