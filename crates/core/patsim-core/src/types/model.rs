//! Model and LLM types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which step of the pipeline a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptKind {
    /// Persona-mood realism check
    MoodValidation,
    /// Patient reply generation
    ReplyGeneration,
    /// Patient reply realism scoring
    ReplyEvaluation,
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptKind::MoodValidation => write!(f, "MOOD_VALIDATION"),
            PromptKind::ReplyGeneration => write!(f, "REPLY_GENERATION"),
            PromptKind::ReplyEvaluation => write!(f, "REPLY_EVALUATION"),
        }
    }
}

/// Parameters for text generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// Specific model to use; providers fall back to their own default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One prompt sent to the model collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// Pipeline step issuing the prompt
    pub kind: PromptKind,

    /// Fully rendered prompt text
    pub prompt: String,

    /// Generation parameters
    #[serde(default)]
    pub params: GenerationParams,
}

impl CompletionRequest {
    /// Create a request
    pub fn new(kind: PromptKind, prompt: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            params,
        }
    }
}

/// Text completion capability backing every pipeline step
///
/// Implementations are opaque, possibly failing and network bound. Errors
/// are returned as-is; callers do not retry on them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Complete a prompt and return the raw response text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
