//! Patient reply generation

use crate::parsing::parse_reply;
use crate::templates::{persona_prompt_data, TemplateEngine};
use crate::types::{
    CompletionRequest, ConversationContext, GenerationParams, LanguageModel, PatientPersona,
    PromptKind,
};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Produces one patient reply per call; retrying is the workflow's job
pub struct ReplyGenerator {
    model: Arc<dyn LanguageModel>,
    templates: Arc<TemplateEngine>,
    params: GenerationParams,
}

impl ReplyGenerator {
    /// Create a generator
    pub fn new(
        model: Arc<dyn LanguageModel>,
        templates: Arc<TemplateEngine>,
        params: GenerationParams,
    ) -> Self {
        Self {
            model,
            templates,
            params,
        }
    }

    /// Generate a non-empty reply to `therapist_statement`
    #[instrument(skip_all, fields(persona = %persona.id, context = %context.id))]
    pub async fn generate(
        &self,
        persona: &PatientPersona,
        mood: &str,
        context: &ConversationContext,
        therapist_statement: &str,
    ) -> Result<String> {
        let mut data = persona_prompt_data(persona, mood, context);
        data.insert(
            "THERAPIST_STATEMENT".to_string(),
            serde_json::Value::String(therapist_statement.to_string()),
        );
        let prompt = self
            .templates
            .render_prompt(PromptKind::ReplyGeneration, &data)?;

        let response = self
            .model
            .complete(CompletionRequest::new(
                PromptKind::ReplyGeneration,
                prompt,
                self.params.clone(),
            ))
            .await?;

        let reply = parse_reply(&response)?;
        debug!(chars = reply.len(), "Patient reply generated");
        Ok(reply)
    }
}
