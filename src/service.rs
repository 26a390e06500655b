//! The memory service: orchestrates AI enrichment, the relational store,
//! and the vector index behind one handle.
//!
//! Writes follow a fixed order: all AI derivation happens before anything
//! is persisted, the relational store commits first, and the index is
//! updated last. An index write that fails after the relational commit is
//! logged and left for [`MemoryService::reindex_user`] to repair — the
//! memory exists and is readable, it just won't surface in semantic
//! queries until then.
//!
//! AI calls are awaited before the connection lock is taken, so the lock
//! is never held across an await point.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::ai::{analysis, nudgegen, ChatProvider, EmbeddingProvider};
use crate::config::KeepsakeConfig;
use crate::error::{Error, QueryStage, Result};
use crate::index;
use crate::journal::{nudges, people, records, types::*};

/// Hard cap on memory content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Generated nudges stop surfacing after this many days.
const NUDGE_TTL_DAYS: i64 = 7;

/// Upper bound on the pattern-analysis window.
const PATTERN_WINDOW: usize = 100;

/// Emotions we expect to see somewhere in a healthy recent window; absent
/// ones are reported to the nudge generator as gaps.
const CORE_EMOTIONS: &[&str] = &["joy", "gratitude", "calm", "excitement", "pride"];

/// One retrieval hit: the full memory plus its cosine similarity.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMemory {
    pub memory: Memory,
    pub similarity: f64,
}

/// The complete result of a semantic query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// Matches in descending similarity order.
    pub matches: Vec<RetrievedMemory>,
    /// Natural-language explanation of why these memories matched.
    pub explanation: String,
    /// Similarity of the best match, or 0.0 when nothing matched.
    pub confidence: f64,
}

pub struct MemoryService {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    config: Arc<KeepsakeConfig>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

fn check_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::Validation("memory content cannot be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(Error::Validation(format!(
            "memory content exceeds {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

/// Union of user-supplied and AI-suggested tags, first occurrence wins.
fn merge_tags(user_tags: &[String], ai_tags: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for tag in user_tags.iter().chain(ai_tags.iter()) {
        let normalized = tag.trim();
        if normalized.is_empty() {
            continue;
        }
        if !merged.iter().any(|t| t.eq_ignore_ascii_case(normalized)) {
            merged.push(normalized.to_string());
        }
    }
    merged
}

/// Derive behavioral signals for nudge generation from the recent window.
fn derive_signals(recent: &[Memory], known_people: &[Person]) -> NudgeSignals {
    let days_since_last_memory = recent.first().and_then(|m| {
        DateTime::parse_from_rfc3339(&m.created_at)
            .ok()
            .map(|t| (Utc::now() - t.with_timezone(&Utc)).num_days().max(0) as u32)
    });

    let emotional_gaps = if recent.is_empty() {
        Vec::new()
    } else {
        let observed: Vec<String> = recent
            .iter()
            .map(|m| m.emotion.primary.to_lowercase())
            .collect();
        CORE_EMOTIONS
            .iter()
            .filter(|e| !observed.iter().any(|o| o == *e))
            .map(|e| e.to_string())
            .collect()
    };

    let mentioned: Vec<&str> = recent
        .iter()
        .flat_map(|m| m.people.iter().map(String::as_str))
        .collect();
    let inactive_people = known_people
        .iter()
        .filter(|p| !mentioned.contains(&p.id.as_str()))
        .map(|p| p.name.clone())
        .collect();

    NudgeSignals {
        days_since_last_memory,
        emotional_gaps,
        inactive_people,
    }
}

impl MemoryService {
    pub fn new(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        config: Arc<KeepsakeConfig>,
    ) -> Self {
        Self {
            conn: Mutex::new(conn),
            embedder,
            chat,
            config,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::RelationalStore("connection lock poisoned".into()))
    }

    /// Comma-joined display names for the given person ids, skipping
    /// anything that no longer resolves.
    fn people_names(&self, conn: &Connection, user_id: &str, ids: &[String]) -> String {
        ids.iter()
            .filter_map(|id| people::get(conn, id, user_id).ok().map(|p| p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn index_entry_for(&self, conn: &Connection, memory: &Memory) -> index::IndexEntry {
        index::IndexEntry {
            id: memory.id.clone(),
            user_id: memory.user_id.clone(),
            content: memory.content.clone(),
            summary: memory.summary.clone(),
            metadata: index::EntryMetadata {
                title: memory.title.clone(),
                people: self.people_names(conn, &memory.user_id, &memory.people),
                tags: memory.tags.join(", "),
                mood: memory.mood,
            },
            embedding: memory.embedding.clone(),
        }
    }

    /// Resolve person names to ids, creating unknown people on the fly.
    fn resolve_people(
        &self,
        conn: &Connection,
        user_id: &str,
        names: &[String],
    ) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let id = match people::find_by_name(conn, user_id, name)? {
                Some(person) => person.id,
                None => {
                    let person = Person {
                        id: new_id(),
                        user_id: user_id.to_string(),
                        name: name.to_string(),
                        relationship: None,
                        avatar_ref: None,
                        tags: Vec::new(),
                        created_at: now_rfc3339(),
                    };
                    people::insert(conn, &person)?;
                    person.id
                }
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Map person names from generated output to stored person ids. Names
    /// that don't resolve are dropped rather than invented.
    fn known_person_ids(
        &self,
        conn: &Connection,
        user_id: &str,
        names: &[String],
    ) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for name in names {
            match people::find_by_name(conn, user_id, name.trim())? {
                Some(person) => {
                    if !ids.contains(&person.id) {
                        ids.push(person.id);
                    }
                }
                None => {
                    tracing::warn!(user_id, %name, "dropping unknown person from nudge");
                }
            }
        }
        Ok(ids)
    }

    // ── Memory operations ─────────────────────────────────────────────────

    /// Create a memory: summarize and embed the content, commit the row,
    /// then index it.
    pub async fn create_memory(&self, user_id: &str, input: NewMemory) -> Result<Memory> {
        check_content(&input.content)?;

        let analysis =
            analysis::summarize(&*self.chat, &self.config.ai, &input.content, &input.people)
                .await?;
        let embedding = self.embedder.embed(&input.content).await?;

        let now = now_rfc3339();
        let conn = self.lock()?;
        let people_ids = self.resolve_people(&conn, user_id, &input.people)?;
        let user_tags = merge_tags(&input.tags, &[]);

        let memory = Memory {
            id: new_id(),
            user_id: user_id.to_string(),
            content: input.content,
            title: input.title,
            summary: analysis.summary,
            emotion: analysis.emotion,
            mood: analysis.mood,
            tags: merge_tags(&user_tags, &analysis.tags),
            user_tags,
            people: people_ids,
            location: input.location,
            weather: input.weather,
            is_private: input.is_private,
            audio_ref: input.audio_ref,
            image_ref: input.image_ref,
            embedding,
            created_at: now.clone(),
            updated_at: now,
        };

        records::insert(&conn, &memory)?;
        if let Err(e) = index::upsert(&conn, &self.index_entry_for(&conn, &memory)) {
            tracing::warn!(memory_id = %memory.id, error = %e,
                "index write failed after store commit; run reindex to repair");
        }

        tracing::info!(memory_id = %memory.id, user_id, "memory created");
        Ok(memory)
    }

    pub fn get_memory(&self, user_id: &str, id: &str) -> Result<Memory> {
        let conn = self.lock()?;
        records::get(&conn, id, user_id)
    }

    /// Apply a partial update. A content change re-derives summary,
    /// emotion, mood, AI tags, and the embedding before anything persists.
    pub async fn update_memory(
        &self,
        user_id: &str,
        id: &str,
        patch: MemoryPatch,
    ) -> Result<Memory> {
        let mut memory = {
            let conn = self.lock()?;
            records::get(&conn, id, user_id)?
        };

        let content_changed = patch
            .content
            .as_ref()
            .is_some_and(|c| *c != memory.content);

        if let Some(content) = patch.content {
            check_content(&content)?;
            memory.content = content;
        }
        if let Some(title) = patch.title {
            memory.title = Some(title);
        }
        if let Some(location) = patch.location {
            memory.location = Some(location);
        }
        if let Some(weather) = patch.weather {
            memory.weather = Some(weather);
        }
        if let Some(is_private) = patch.is_private {
            memory.is_private = is_private;
        }

        let people_names = patch.people;

        if let Some(tags) = patch.tags {
            // The AI-suggested portion is whatever of the merged set the
            // user didn't supply; keep it when only the user tags change.
            let ai_tags: Vec<String> = memory
                .tags
                .iter()
                .filter(|t| !memory.user_tags.iter().any(|u| u.eq_ignore_ascii_case(t)))
                .cloned()
                .collect();
            memory.user_tags = merge_tags(&tags, &[]);
            if !content_changed {
                memory.tags = merge_tags(&memory.user_tags, &ai_tags);
            }
        }

        if content_changed {
            let hint = people_names.clone().unwrap_or_default();
            let analysis =
                analysis::summarize(&*self.chat, &self.config.ai, &memory.content, &hint).await?;
            memory.summary = analysis.summary;
            memory.emotion = analysis.emotion;
            memory.mood = analysis.mood;
            memory.tags = merge_tags(&memory.user_tags, &analysis.tags);
            memory.embedding = self.embedder.embed(&memory.content).await?;
        }

        memory.updated_at = now_rfc3339();

        let conn = self.lock()?;
        if let Some(names) = people_names {
            memory.people = self.resolve_people(&conn, user_id, &names)?;
        }
        records::update(&conn, &memory)?;
        if let Err(e) = index::upsert(&conn, &self.index_entry_for(&conn, &memory)) {
            tracing::warn!(memory_id = %memory.id, error = %e,
                "index write failed after store commit; run reindex to repair");
        }

        Ok(memory)
    }

    /// Delete from both stores. The index delete is idempotent, so a
    /// memory that never made it into the index still deletes cleanly.
    pub fn delete_memory(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        records::delete(&conn, id, user_id)?;
        index::delete(&conn, id)?;
        tracing::info!(memory_id = %id, user_id, "memory deleted");
        Ok(())
    }

    pub fn list_recent_memories(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>> {
        let conn = self.lock()?;
        records::list_recent(&conn, user_id, limit)
    }

    // ── Retrieval ─────────────────────────────────────────────────────────

    /// Semantic query: embed, search the index, hydrate full records, and
    /// explain. An empty result is a valid outcome with confidence 0.0.
    pub async fn query_memories(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<usize>,
        floor: Option<f64>,
    ) -> Result<QueryOutcome> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query cannot be empty".into()));
        }
        let limit = limit.unwrap_or(self.config.retrieval.default_limit);
        let floor = floor.unwrap_or(self.config.retrieval.similarity_floor);

        let embedding = self.embedder.embed(query).await.map_err(|e| Error::Query {
            stage: QueryStage::Embed,
            message: e.to_string(),
        })?;

        let (hits, memories) = {
            let conn = self.lock()?;
            let hits = index::query(&conn, &embedding, user_id, limit, floor).map_err(|e| {
                Error::Query {
                    stage: QueryStage::Search,
                    message: e.to_string(),
                }
            })?;

            let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
            let memories = records::fetch_ordered(&conn, &ids, user_id).map_err(|e| {
                Error::Query {
                    stage: QueryStage::Hydrate,
                    message: e.to_string(),
                }
            })?;
            (hits, memories)
        };

        if memories.len() < hits.len() {
            // Index/store divergence: an indexed id no longer exists in the
            // authoritative store. Drop it from the result and move on.
            tracing::warn!(
                indexed = hits.len(),
                hydrated = memories.len(),
                user_id,
                "dropping stale index entries from query result"
            );
        }

        if memories.is_empty() {
            return Ok(QueryOutcome {
                matches: Vec::new(),
                explanation: "No memories matched that query.".into(),
                confidence: 0.0,
            });
        }

        let similarity_of = |id: &str| {
            hits.iter()
                .find(|h| h.id == id)
                .map(|h| h.similarity)
                .unwrap_or(0.0)
        };
        let matches: Vec<RetrievedMemory> = memories
            .into_iter()
            .map(|memory| {
                let similarity = similarity_of(&memory.id);
                RetrievedMemory { memory, similarity }
            })
            .collect();
        let confidence = matches.first().map(|m| m.similarity).unwrap_or(0.0);

        let summaries: Vec<String> = matches.iter().map(|m| m.memory.summary.clone()).collect();
        let explanation = analysis::explain(&*self.chat, &self.config.ai, query, &summaries).await;

        Ok(QueryOutcome {
            matches,
            explanation,
            confidence,
        })
    }

    // ── Nudges ────────────────────────────────────────────────────────────

    /// Generate and persist a batch of nudges. Callers may supply their own
    /// behavioral signals; otherwise they are derived from the recent window.
    pub async fn generate_nudges(
        &self,
        user_id: &str,
        signals: Option<NudgeSignals>,
    ) -> Result<Vec<Nudge>> {
        let (signals, summaries, names) = {
            let conn = self.lock()?;
            let recent = records::list_recent(&conn, user_id, self.config.nudges.context_window)?;
            let known = people::list(&conn, user_id)?;
            let signals = signals.unwrap_or_else(|| derive_signals(&recent, &known));
            let summaries: Vec<String> = recent.iter().map(|m| m.summary.clone()).collect();
            let names: Vec<String> = known.into_iter().map(|p| p.name).collect();
            (signals, summaries, names)
        };

        let candidates = nudgegen::generate(
            &*self.chat,
            &self.config.ai,
            &signals,
            &summaries,
            &names,
            self.config.nudges.max_per_batch,
        )
        .await?;

        let now = Utc::now();
        let expires_at = (now + Duration::days(NUDGE_TTL_DAYS)).to_rfc3339();

        let conn = self.lock()?;
        let mut persisted = Vec::new();
        for candidate in candidates {
            // Candidates name people; the stored record references their ids.
            let related_people =
                self.known_person_ids(&conn, user_id, &candidate.related_people)?;
            let nudge = Nudge {
                id: new_id(),
                user_id: user_id.to_string(),
                nudge_type: candidate.nudge_type,
                priority: candidate.priority,
                title: candidate.title,
                message: candidate.message,
                related_people,
                related_memories: Vec::new(),
                is_read: false,
                is_actioned: false,
                expires_at: Some(expires_at.clone()),
                created_at: now.to_rfc3339(),
            };
            nudges::insert(&conn, &nudge)?;
            persisted.push(nudge);
        }

        tracing::info!(user_id, count = persisted.len(), "nudges generated");
        Ok(persisted)
    }

    pub fn list_nudges(&self, user_id: &str, unread_only: bool) -> Result<Vec<Nudge>> {
        let conn = self.lock()?;
        nudges::list_active(&conn, user_id, &now_rfc3339(), unread_only)
    }

    pub fn mark_nudge_read(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        nudges::mark_read(&conn, id, user_id)
    }

    pub fn mark_nudge_actioned(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        nudges::mark_actioned(&conn, id, user_id)
    }

    pub fn delete_nudge(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        nudges::delete(&conn, id, user_id)
    }

    // ── People ────────────────────────────────────────────────────────────

    pub fn add_person(
        &self,
        user_id: &str,
        name: &str,
        relationship: Option<String>,
    ) -> Result<Person> {
        if name.trim().is_empty() {
            return Err(Error::Validation("person name cannot be empty".into()));
        }
        let person = Person {
            id: new_id(),
            user_id: user_id.to_string(),
            name: name.trim().to_string(),
            relationship,
            avatar_ref: None,
            tags: Vec::new(),
            created_at: now_rfc3339(),
        };
        let conn = self.lock()?;
        people::insert(&conn, &person)?;
        Ok(person)
    }

    pub fn get_person(&self, user_id: &str, id: &str) -> Result<Person> {
        let conn = self.lock()?;
        people::get(&conn, id, user_id)
    }

    pub fn list_people(&self, user_id: &str) -> Result<Vec<Person>> {
        let conn = self.lock()?;
        people::list(&conn, user_id)
    }

    pub fn update_person(&self, person: &Person) -> Result<()> {
        let conn = self.lock()?;
        people::update(&conn, person)
    }

    /// Fails while any memory still references the person.
    pub fn delete_person(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.lock()?;
        people::delete(&conn, id, user_id)
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    /// Rebuild the user's vector index from the authoritative store, using
    /// the embeddings persisted with each memory. Returns how many entries
    /// the rebuilt index holds.
    pub fn reindex_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        index::delete_by_user(&conn, user_id)?;

        let all = records::list_all(&conn, user_id)?;
        for memory in &all {
            index::upsert(&conn, &self.index_entry_for(&conn, memory))?;
        }

        tracing::info!(user_id, count = all.len(), "index rebuilt");
        Ok(all.len())
    }

    /// Analyze emotional patterns over the most recent memories (up to 100).
    pub async fn analyze_patterns(&self, user_id: &str) -> Result<analysis::PatternAnalysis> {
        let inputs: Vec<analysis::PatternInput> = {
            let conn = self.lock()?;
            let mut recent = records::list_recent(&conn, user_id, PATTERN_WINDOW)?;
            recent.reverse(); // oldest first for trend detection
            recent
                .into_iter()
                .map(|m| analysis::PatternInput {
                    summary: m.summary,
                    mood: m.mood,
                    primary_emotion: m.emotion.primary,
                    created_at: m.created_at,
                })
                .collect()
        };

        if inputs.is_empty() {
            return Err(Error::Validation(
                "no memories to analyze yet".into(),
            ));
        }

        analysis::analyze_patterns(&*self.chat, &self.config.ai, &inputs).await
    }
}
