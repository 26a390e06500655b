#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use keepsake::ai::{ChatFailure, ChatProvider, EmbeddingProvider};
use keepsake::config::KeepsakeConfig;
use keepsake::db;
use keepsake::error::{Error, Result};
use keepsake::MemoryService;

/// Test embedding width; keeps vectors small and readable.
pub const DIMS: usize = 8;

/// Unit vector with a spike at `seed`.
pub fn axis(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 1.0;
    v
}

/// A vector with high (but not perfect) cosine similarity to `axis(seed)`.
pub fn near_axis(seed: usize) -> Vec<f32> {
    let mut v = axis(seed);
    v[(seed + 1) % DIMS] = 0.2;
    v
}

/// Deterministic embedding service double. Returns a registered vector for
/// known texts and a byte-hash spike otherwise; can be switched into a
/// failing mode.
pub struct FakeEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    fail: AtomicBool,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Pin the embedding returned for an exact text.
    pub fn map_text(&self, text: &str, vector: Vec<f32>) {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Embedding("embedding service unavailable".into()));
        }
        if let Some(v) = self.vectors.lock().unwrap().get(text) {
            return Ok(v.clone());
        }
        let seed = text.bytes().map(usize::from).sum::<usize>();
        Ok(axis(seed))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Chat service double fed by a queue of canned replies. When the queue is
/// empty it returns a valid analysis payload so memory creation works
/// without per-test setup.
pub struct FakeChat {
    replies: Mutex<VecDeque<String>>,
    fail: AtomicBool,
}

impl FakeChat {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatProvider for FakeChat {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> std::result::Result<String, ChatFailure> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatFailure("chat service unavailable".into()));
        }
        let queued = self.replies.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| analysis_reply("A summary.", "calm", 5)))
    }
}

/// A well-formed summarization reply.
pub fn analysis_reply(summary: &str, emotion: &str, mood: u8) -> String {
    format!(
        r#"{{
            "summary": "{summary}",
            "emotion": {{"primary": "{emotion}", "secondary": [], "intensity": 5, "valence": "neutral"}},
            "tags": ["test"],
            "mood": {mood}
        }}"#
    )
}

/// An analysis reply with caller-chosen suggested tags.
pub fn analysis_reply_with_tags(summary: &str, tags: &[&str]) -> String {
    let tags = tags
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"{{
            "summary": "{summary}",
            "emotion": {{"primary": "calm", "secondary": [], "intensity": 5, "valence": "neutral"}},
            "tags": [{tags}],
            "mood": 5
        }}"#
    )
}

/// A well-formed nudge-generation reply with two candidates.
pub fn nudge_reply() -> String {
    r#"[
        {"type": "reconnect", "priority": "high", "title": "Call Alex",
         "message": "It has been a while since Alex came up.", "related_people": ["Alex"]},
        {"type": "log_memory", "priority": "low", "title": "Write tonight",
         "message": "A short entry keeps the habit alive."}
    ]"#
    .to_string()
}

/// A well-formed pattern-analysis reply.
pub fn patterns_reply() -> String {
    r#"{
        "dominant_emotions": ["calm"],
        "mood_trend": "stable",
        "emotional_gaps": ["excitement"],
        "recommendations": ["Try something new this weekend."]
    }"#
    .to_string()
}

pub fn test_config() -> KeepsakeConfig {
    let mut config = KeepsakeConfig::default();
    config.ai.embedding_dimensions = DIMS;
    config
}

/// A fully wired service over a fresh in-memory database, with handles to
/// both AI doubles for steering.
pub fn test_service() -> (MemoryService, Arc<FakeEmbedder>, Arc<FakeChat>) {
    let conn = db::open_memory_database(DIMS).unwrap();
    service_over(conn)
}

/// Wrap an existing (possibly pre-seeded) connection in a service.
pub fn service_over(conn: Connection) -> (MemoryService, Arc<FakeEmbedder>, Arc<FakeChat>) {
    let embedder = Arc::new(FakeEmbedder::new());
    let chat = Arc::new(FakeChat::new());
    let service = MemoryService::new(
        conn,
        embedder.clone(),
        chat.clone(),
        Arc::new(test_config()),
    );
    (service, embedder, chat)
}
