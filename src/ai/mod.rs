//! External AI service clients.
//!
//! Provides the [`EmbeddingProvider`] and [`ChatProvider`] traits, the
//! OpenAI-compatible [`remote::RemoteAi`] implementation, and the prompt +
//! strict-validation layers in [`analysis`] and [`nudgegen`]. Providers are
//! injected into the service at construction time — there are no ambient
//! client globals.

pub mod analysis;
pub mod nudgegen;
pub mod remote;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Transport-level failure from the chat service.
///
/// Deliberately not a variant of [`Error`]: the same chat call backs
/// summarization, explanation, and nudge generation, and each caller maps
/// the failure into its own pipeline-specific variant.
#[derive(Debug)]
pub struct ChatFailure(pub String);

impl std::fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ChatFailure {}

/// Trait for embedding text into fixed-dimension vectors.
///
/// Implementations surface any upstream problem (timeout, auth, malformed
/// response, dimension mismatch) as [`Error::Embedding`] — never a zero
/// vector or a cached stale one, since that would corrupt similarity
/// rankings. Embedding is a pure function of its input, so callers may
/// retry at-least-once safely.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single non-empty text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Trait for chat/completion calls against a language model.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// One completion round: system prompt + user prompt → reply text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> std::result::Result<String, ChatFailure>;
}

/// Create the remote providers from config.
///
/// Returns a single [`remote::RemoteAi`] handle that implements both traits;
/// the service clones the `Arc` for each role.
pub fn create_providers(
    config: &crate::config::AiConfig,
) -> anyhow::Result<std::sync::Arc<remote::RemoteAi>> {
    Ok(std::sync::Arc::new(remote::RemoteAi::new(config)?))
}

/// Reject empty or oversized text before it reaches the embedding service.
pub(crate) fn check_embed_input(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::Embedding("cannot embed empty text".into()));
    }
    Ok(())
}
