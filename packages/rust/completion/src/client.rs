use std::time::Duration;

use async_trait::async_trait;
use lessonpath_shared::ModelProfile;

use crate::CompletionError;

/// Fixed system message sent ahead of every user prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert educational content analyzer. \
Provide concise, accurate responses in the exact requested format, \
based only on the context you are given.";

/// One single-turn completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// Capability tier; the service maps it to a concrete model.
    pub profile: ModelProfile,
    /// User message content.
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

/// A black-box text completion provider.
///
/// Implementations never retry; retry and fallback policy belongs to the caller.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Model id a profile resolves to, for reporting.
    fn model_for(&self, profile: ModelProfile) -> String;

    /// Send one prompt and return the trimmed answer text.
    async fn complete(&self, request: &PromptRequest) -> Result<String, CompletionError>;
}
