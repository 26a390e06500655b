//! Summarization, explanation, and pattern-analysis prompts with strict
//! output validation.
//!
//! The chat model is asked for a single JSON object; the reply is extracted
//! via [`extract_json`] and every field is validated for presence and range
//! before anything reaches the store. A schema violation fails closed with
//! [`Error::Summarization`] — partial or garbage payloads are never
//! propagated.

use serde::Deserialize;

use super::ChatProvider;
use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::journal::types::{EmotionAnalysis, Valence};

/// Prompt template version, bumped whenever the instructions change.
pub const PROMPT_VERSION: &str = "v1";

const SUMMARIZE_SYSTEM: &str = "\
You are an empathetic journaling assistant (template v1). Analyze the \
user's memory entry and reply with a single JSON object, no prose:\n\
{\n\
  \"summary\": \"one or two sentences\",\n\
  \"emotion\": {\n\
    \"primary\": \"dominant emotion\",\n\
    \"secondary\": [\"other emotions\"],\n\
    \"intensity\": 1-10,\n\
    \"valence\": \"positive\" | \"negative\" | \"neutral\"\n\
  },\n\
  \"tags\": [\"3-5 short topical tags\"],\n\
  \"mood\": 1-10\n\
}";

const EXPLAIN_SYSTEM: &str = "\
You are a journaling assistant (template v1). Given a search query and the \
summaries of the memories that matched it, reply with one or two plain \
sentences explaining why these memories are relevant to the query. No JSON, \
no lists.";

const PATTERNS_SYSTEM: &str = "\
You are a reflective journaling assistant (template v1). Given a list of \
memory summaries with moods and emotions, reply with a single JSON object, \
no prose:\n\
{\n\
  \"dominant_emotions\": [\"most frequent emotions\"],\n\
  \"mood_trend\": \"improving\" | \"declining\" | \"stable\",\n\
  \"emotional_gaps\": [\"emotions absent or under-represented\"],\n\
  \"recommendations\": [\"1-3 gentle suggestions\"]\n\
}";

/// Fallback used when the explain stage fails — the query must still succeed.
pub const GENERIC_EXPLANATION: &str =
    "These memories were the closest matches to your query.";

const SUMMARIZE_MAX_TOKENS: u32 = 500;
const EXPLAIN_MAX_TOKENS: u32 = 200;
const PATTERNS_MAX_TOKENS: u32 = 600;

/// Validated output of the summarization call.
#[derive(Debug, Clone)]
pub struct MemoryAnalysis {
    pub summary: String,
    pub emotion: EmotionAnalysis,
    pub tags: Vec<String>,
    pub mood: u8,
}

/// Direction of the mood curve over the analyzed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodTrend {
    Improving,
    Declining,
    Stable,
}

/// Validated output of the pattern-analysis call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatternAnalysis {
    pub dominant_emotions: Vec<String>,
    pub mood_trend: MoodTrend,
    pub emotional_gaps: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A memory projected into the pattern-analysis context window.
#[derive(Debug, Clone)]
pub struct PatternInput {
    pub summary: String,
    pub mood: u8,
    pub primary_emotion: String,
    pub created_at: String,
}

// ── Raw (untrusted) payload shapes ────────────────────────────────────────────

/// Untrusted summarization payload. Every field is optional here so that
/// validation, not deserialization, decides what is acceptable and reports
/// which field was wrong.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: Option<String>,
    emotion: Option<RawEmotion>,
    tags: Option<Vec<String>>,
    mood: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawEmotion {
    primary: Option<String>,
    #[serde(default)]
    secondary: Vec<String>,
    intensity: Option<i64>,
    valence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPatterns {
    dominant_emotions: Option<Vec<String>>,
    mood_trend: Option<String>,
    #[serde(default)]
    emotional_gaps: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

// ── JSON extraction ───────────────────────────────────────────────────────────

/// Extract the first valid JSON value from an LLM reply.
///
/// Tries a fenced ```json block first, then falls back to the outermost
/// bare `{...}` or `[...]` span. Returns `None` when nothing parses.
pub fn extract_json<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    if let Some(fence_start) = response.find("```json") {
        let after_fence = &response[fence_start + "```json".len()..];
        if let Some(json_start) = after_fence.find(|c: char| !c.is_whitespace()) {
            let json_body = &after_fence[json_start..];
            if let Some(fence_end) = json_body.find("```") {
                let json_str = json_body[..fence_end].trim();
                if let Ok(val) = serde_json::from_str(json_str) {
                    return Some(val);
                }
            }
        }
    }

    let trimmed = response.trim();
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(start) = trimmed.find(open) {
            if let Some(end) = trimmed.rfind(close) {
                if end > start {
                    if let Ok(val) = serde_json::from_str(&trimmed[start..=end]) {
                        return Some(val);
                    }
                }
            }
        }
    }

    None
}

// ── Validation ────────────────────────────────────────────────────────────────

fn int_in_range(value: Option<i64>, field: &str) -> Result<u8> {
    match value {
        Some(v) if (1..=10).contains(&v) => Ok(v as u8),
        Some(v) => Err(Error::Summarization(format!(
            "{field} out of range: {v} (expected 1-10)"
        ))),
        None => Err(Error::Summarization(format!("missing field: {field}"))),
    }
}

/// Validate an untrusted summarization reply into a [`MemoryAnalysis`].
pub fn validate_analysis(reply: &str) -> Result<MemoryAnalysis> {
    let raw: RawAnalysis = extract_json(reply)
        .ok_or_else(|| Error::Summarization("reply contained no valid JSON object".into()))?;

    let summary = match raw.summary {
        Some(s) if !s.trim().is_empty() => s,
        Some(_) => return Err(Error::Summarization("summary is empty".into())),
        None => return Err(Error::Summarization("missing field: summary".into())),
    };

    let emotion = raw
        .emotion
        .ok_or_else(|| Error::Summarization("missing field: emotion".into()))?;
    let primary = match emotion.primary {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(Error::Summarization("missing field: emotion.primary".into())),
    };
    let intensity = int_in_range(emotion.intensity, "emotion.intensity")?;
    let valence: Valence = emotion
        .valence
        .as_deref()
        .ok_or_else(|| Error::Summarization("missing field: emotion.valence".into()))?
        .parse()
        .map_err(Error::Summarization)?;

    let tags = raw
        .tags
        .ok_or_else(|| Error::Summarization("missing field: tags".into()))?;
    let mood = int_in_range(raw.mood, "mood")?;

    Ok(MemoryAnalysis {
        summary,
        emotion: EmotionAnalysis {
            primary,
            secondary: emotion.secondary,
            intensity,
            valence,
        },
        tags,
        mood,
    })
}

fn validate_patterns(reply: &str) -> Result<PatternAnalysis> {
    let raw: RawPatterns = extract_json(reply)
        .ok_or_else(|| Error::Summarization("reply contained no valid JSON object".into()))?;

    let dominant_emotions = raw
        .dominant_emotions
        .ok_or_else(|| Error::Summarization("missing field: dominant_emotions".into()))?;
    let mood_trend = match raw.mood_trend.as_deref() {
        Some("improving") => MoodTrend::Improving,
        Some("declining") => MoodTrend::Declining,
        Some("stable") => MoodTrend::Stable,
        Some(other) => {
            return Err(Error::Summarization(format!("unknown mood_trend: {other}")))
        }
        None => return Err(Error::Summarization("missing field: mood_trend".into())),
    };

    Ok(PatternAnalysis {
        dominant_emotions,
        mood_trend,
        emotional_gaps: raw.emotional_gaps,
        recommendations: raw.recommendations,
    })
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Summarize memory content into a validated [`MemoryAnalysis`].
pub async fn summarize(
    chat: &dyn ChatProvider,
    config: &AiConfig,
    content: &str,
    people_hint: &[String],
) -> Result<MemoryAnalysis> {
    let user_prompt = if people_hint.is_empty() {
        format!("Memory entry:\n{content}")
    } else {
        format!(
            "Memory entry:\n{content}\n\nPeople mentioned: {}",
            people_hint.join(", ")
        )
    };

    let reply = chat
        .complete(
            SUMMARIZE_SYSTEM,
            &user_prompt,
            config.analysis_temperature,
            SUMMARIZE_MAX_TOKENS,
        )
        .await
        .map_err(|e| Error::Summarization(e.0))?;

    validate_analysis(&reply)
}

/// Explain why a set of candidate summaries matched a query. Best-effort:
/// any failure degrades to [`GENERIC_EXPLANATION`], never an error.
pub async fn explain(
    chat: &dyn ChatProvider,
    config: &AiConfig,
    query: &str,
    candidate_summaries: &[String],
) -> String {
    let user_prompt = format!(
        "Query: {query}\n\nMatched memory summaries:\n{}",
        candidate_summaries
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    );

    match chat
        .complete(
            EXPLAIN_SYSTEM,
            &user_prompt,
            config.analysis_temperature,
            EXPLAIN_MAX_TOKENS,
        )
        .await
    {
        Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
        Ok(_) => GENERIC_EXPLANATION.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "explain stage failed, using generic explanation");
            GENERIC_EXPLANATION.to_string()
        }
    }
}

/// Batch pattern analysis over a bounded recent window (caller caps at 100).
pub async fn analyze_patterns(
    chat: &dyn ChatProvider,
    config: &AiConfig,
    memories: &[PatternInput],
) -> Result<PatternAnalysis> {
    let lines: Vec<String> = memories
        .iter()
        .map(|m| {
            format!(
                "- [{}] mood {}, feeling {}: {}",
                m.created_at, m.mood, m.primary_emotion, m.summary
            )
        })
        .collect();
    let user_prompt = format!("Recent memories, oldest first:\n{}", lines.join("\n"));

    let reply = chat
        .complete(
            PATTERNS_SYSTEM,
            &user_prompt,
            config.analysis_temperature,
            PATTERNS_MAX_TOKENS,
        )
        .await
        .map_err(|e| Error::Summarization(e.0))?;

    validate_patterns(&reply)
}
