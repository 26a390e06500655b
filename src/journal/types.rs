//! Core domain type definitions.
//!
//! Defines [`Memory`] (a journal entry enriched with AI-derived fields),
//! [`EmotionAnalysis`] and [`Valence`], [`Person`] (a contact referenced by
//! memories), and [`Nudge`] (a generated suggestion).

use serde::{Deserialize, Serialize};

/// Emotional polarity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    Positive,
    Negative,
    Neutral,
}

impl Valence {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Valence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Valence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            _ => Err(format!("unknown valence: {s}")),
        }
    }
}

/// AI-derived emotion classification for a memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    /// Dominant emotion label (e.g. `"joy"`).
    pub primary: String,
    /// Secondary emotions, strongest first.
    pub secondary: Vec<String>,
    /// Intensity of the primary emotion, 1–10.
    pub intensity: u8,
    /// Overall polarity.
    pub valence: Valence,
}

/// A journal entry, matching the `memories` table schema.
///
/// `summary`, `emotion`, `mood`, and `embedding` are derived by the AI
/// pipeline and regenerated whenever `content` changes — a stale
/// (content, embedding) pair is a correctness bug, not an accepted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user. Immutable once created.
    pub user_id: String,
    /// The raw text of the memory.
    pub content: String,
    pub title: Option<String>,
    /// AI-generated short summary.
    pub summary: String,
    /// AI-derived emotion classification.
    pub emotion: EmotionAnalysis,
    /// Mood score 1–10.
    pub mood: u8,
    /// Union of user tags and AI-suggested tags.
    pub tags: Vec<String>,
    /// The user-supplied portion of `tags`, kept separately so a
    /// re-summarization replaces the AI-suggested portion instead of
    /// accreting onto it.
    pub user_tags: Vec<String>,
    /// IDs of [`Person`] records mentioned in this memory.
    pub people: Vec<String>,
    pub location: Option<String>,
    pub weather: Option<String>,
    pub is_private: bool,
    pub audio_ref: Option<String>,
    pub image_ref: Option<String>,
    /// Embedding of `content`, persisted so the vector index can be
    /// re-derived without re-embedding.
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-modification timestamp.
    pub updated_at: String,
}

/// Caller-supplied fields for creating a memory.
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub content: String,
    pub title: Option<String>,
    /// Names of people mentioned, forwarded to the summarizer as a hint.
    pub people: Vec<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub weather: Option<String>,
    pub is_private: bool,
    pub audio_ref: Option<String>,
    pub image_ref: Option<String>,
}

/// Partial update for a memory. `None` fields are left untouched.
///
/// Changing `content` triggers re-summarization and re-embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub title: Option<String>,
    pub people: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub weather: Option<String>,
    pub is_private: Option<bool>,
}

/// A contact referenced by memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub user_id: String,
    /// Display name, unique per user (case-insensitive).
    pub name: String,
    pub relationship: Option<String>,
    pub avatar_ref: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
}

/// Category of a generated nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeType {
    Reconnect,
    LogMemory,
    EmotionalGap,
    PersonReminder,
}

impl NudgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reconnect => "reconnect",
            Self::LogMemory => "log_memory",
            Self::EmotionalGap => "emotional_gap",
            Self::PersonReminder => "person_reminder",
        }
    }
}

impl std::fmt::Display for NudgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NudgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reconnect" => Ok(Self::Reconnect),
            "log_memory" => Ok(Self::LogMemory),
            "emotional_gap" => Ok(Self::EmotionalGap),
            "person_reminder" => Ok(Self::PersonReminder),
            _ => Err(format!("unknown nudge type: {s}")),
        }
    }
}

/// Urgency of a generated nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgePriority {
    Low,
    Medium,
    High,
}

impl NudgePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for NudgePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NudgePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unknown nudge priority: {s}")),
        }
    }
}

/// A generated suggestion prompting user action.
///
/// `is_read` and `is_actioned` are monotonic: false → true only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nudge {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub nudge_type: NudgeType,
    pub priority: NudgePriority,
    pub title: String,
    pub message: String,
    /// IDs of [`Person`] records this nudge concerns.
    pub related_people: Vec<String>,
    pub related_memories: Vec<String>,
    pub is_read: bool,
    pub is_actioned: bool,
    /// The nudge becomes inert after this instant.
    pub expires_at: Option<String>,
    pub created_at: String,
}

/// Lightweight behavioral signals driving nudge generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NudgeSignals {
    pub days_since_last_memory: Option<u32>,
    /// Emotions under-represented in recent entries.
    pub emotional_gaps: Vec<String>,
    /// Names of people not mentioned recently.
    pub inactive_people: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn valence_round_trip() {
        for v in [Valence::Positive, Valence::Negative, Valence::Neutral] {
            assert_eq!(Valence::from_str(v.as_str()).unwrap(), v);
        }
        assert!(Valence::from_str("ecstatic").is_err());
    }

    #[test]
    fn nudge_type_round_trip() {
        for t in [
            NudgeType::Reconnect,
            NudgeType::LogMemory,
            NudgeType::EmotionalGap,
            NudgeType::PersonReminder,
        ] {
            assert_eq!(NudgeType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(NudgeType::from_str("motivate").is_err());
    }

    #[test]
    fn nudge_priority_round_trip() {
        for p in [NudgePriority::Low, NudgePriority::Medium, NudgePriority::High] {
            assert_eq!(NudgePriority::from_str(p.as_str()).unwrap(), p);
        }
        assert!(NudgePriority::from_str("urgent").is_err());
    }

    #[test]
    fn memory_serializes_without_embedding() {
        let memory = Memory {
            id: "m1".into(),
            user_id: "u1".into(),
            content: "walked the dog".into(),
            title: None,
            summary: "A walk".into(),
            emotion: EmotionAnalysis {
                primary: "calm".into(),
                secondary: vec![],
                intensity: 4,
                valence: Valence::Positive,
            },
            mood: 7,
            tags: vec!["outdoors".into()],
            user_tags: vec![],
            people: vec![],
            location: None,
            weather: None,
            is_private: false,
            audio_ref: None,
            image_ref: None,
            embedding: vec![0.1, 0.2],
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&memory).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["mood"], 7);
        assert_eq!(json["emotion"]["valence"], "positive");
    }
}
