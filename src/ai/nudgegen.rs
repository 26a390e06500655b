//! Nudge generation prompt and per-candidate validation.
//!
//! The chat model is asked for 2–4 candidate nudges as a JSON array. The
//! whole reply failing to parse aborts generation with
//! [`Error::NudgeGeneration`] (nudges have no non-AI fallback value), but
//! an individual malformed candidate is dropped with a warning rather than
//! poisoning the batch.

use serde::Deserialize;

use super::ChatProvider;
use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::journal::types::{NudgePriority, NudgeSignals, NudgeType};

const NUDGE_SYSTEM: &str = "\
You are a caring journaling companion (template v1). Based on the user's \
recent activity, suggest 2-4 nudges. Reply with a single JSON array, no \
prose. Each element:\n\
{\n\
  \"type\": \"reconnect\" | \"log_memory\" | \"emotional_gap\" | \"person_reminder\",\n\
  \"priority\": \"low\" | \"medium\" | \"high\",\n\
  \"title\": \"short title\",\n\
  \"message\": \"one or two warm, encouraging sentences\",\n\
  \"related_people\": [\"names from the provided list only\"]\n\
}";

const NUDGE_MAX_TOKENS: u32 = 700;

/// A validated nudge candidate, not yet persisted.
#[derive(Debug, Clone)]
pub struct NudgeCandidate {
    pub nudge_type: NudgeType,
    pub priority: NudgePriority,
    pub title: String,
    pub message: String,
    pub related_people: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(rename = "type")]
    nudge_type: Option<String>,
    priority: Option<String>,
    title: Option<String>,
    message: Option<String>,
    #[serde(default)]
    related_people: Vec<String>,
}

fn validate_candidate(raw: RawCandidate) -> std::result::Result<NudgeCandidate, String> {
    let nudge_type: NudgeType = raw
        .nudge_type
        .as_deref()
        .ok_or_else(|| "missing field: type".to_string())?
        .parse()?;
    let priority: NudgePriority = raw
        .priority
        .as_deref()
        .ok_or_else(|| "missing field: priority".to_string())?
        .parse()?;
    let title = match raw.title {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err("missing field: title".into()),
    };
    let message = match raw.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => return Err("missing field: message".into()),
    };

    Ok(NudgeCandidate {
        nudge_type,
        priority,
        title,
        message,
        related_people: raw.related_people,
    })
}

/// Parse and validate a generation reply. Malformed individual candidates
/// are dropped; a reply with no parseable array at all is a hard failure.
pub fn parse_candidates(reply: &str, max: usize) -> Result<Vec<NudgeCandidate>> {
    let raw: Vec<RawCandidate> = super::analysis::extract_json(reply)
        .or_else(|| {
            // Some models wrap the array in an object: {"nudges": [...]}
            #[derive(Deserialize)]
            struct Wrapper {
                nudges: Vec<RawCandidate>,
            }
            super::analysis::extract_json::<Wrapper>(reply).map(|w| w.nudges)
        })
        .ok_or_else(|| Error::NudgeGeneration("reply contained no valid JSON array".into()))?;

    let mut candidates = Vec::new();
    for raw_candidate in raw {
        match validate_candidate(raw_candidate) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => {
                tracing::warn!(%reason, "dropping malformed nudge candidate");
            }
        }
    }
    candidates.truncate(max);
    Ok(candidates)
}

/// Build the user prompt from behavioral signals and bounded context.
pub fn build_prompt(
    signals: &NudgeSignals,
    recent_summaries: &[String],
    people_names: &[String],
) -> String {
    let mut sections = Vec::new();

    if let Some(days) = signals.days_since_last_memory {
        sections.push(format!("Days since last journal entry: {days}"));
    }
    if !signals.emotional_gaps.is_empty() {
        sections.push(format!(
            "Emotions missing from recent entries: {}",
            signals.emotional_gaps.join(", ")
        ));
    }
    if !signals.inactive_people.is_empty() {
        sections.push(format!(
            "People not mentioned recently: {}",
            signals.inactive_people.join(", ")
        ));
    }
    if !people_names.is_empty() {
        sections.push(format!("All known people: {}", people_names.join(", ")));
    }
    if !recent_summaries.is_empty() {
        sections.push(format!(
            "Recent memory summaries:\n{}",
            recent_summaries
                .iter()
                .map(|s| format!("- {s}"))
                .collect::<Vec<_>>()
                .join("\n")
        ));
    }
    if sections.is_empty() {
        sections.push("No recent activity recorded.".to_string());
    }

    sections.join("\n\n")
}

/// Run one generation round against the chat service.
pub async fn generate(
    chat: &dyn ChatProvider,
    config: &AiConfig,
    signals: &NudgeSignals,
    recent_summaries: &[String],
    people_names: &[String],
    max: usize,
) -> Result<Vec<NudgeCandidate>> {
    let user_prompt = build_prompt(signals, recent_summaries, people_names);

    let reply = chat
        .complete(
            NUDGE_SYSTEM,
            &user_prompt,
            config.nudge_temperature,
            NUDGE_MAX_TOKENS,
        )
        .await
        .map_err(|e| Error::NudgeGeneration(e.0))?;

    parse_candidates(&reply, max)
}
