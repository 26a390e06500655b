pub mod maintenance;
pub mod nudge;
pub mod people;
pub mod recall;
pub mod remember;

use anyhow::{Context, Result};
use std::sync::Arc;

use keepsake::ai;
use keepsake::config::KeepsakeConfig;
use keepsake::db;
use keepsake::MemoryService;

/// Wire up the full service from config: database, AI providers, settings.
pub fn build_service(config: KeepsakeConfig) -> Result<MemoryService> {
    let db_path = config.resolved_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data dir: {}", parent.display()))?;
    }

    let conn = db::open_database(&db_path, config.ai.embedding_dimensions)?;
    let remote = ai::create_providers(&config.ai)?;

    Ok(MemoryService::new(
        conn,
        remote.clone(),
        remote,
        Arc::new(config),
    ))
}
