//! Persona-mood realism check

use crate::parsing::parse_assessment;
use crate::templates::{persona_prompt_data, TemplateEngine};
use crate::types::{
    CompletionRequest, ConversationContext, GenerationParams, LanguageModel, PatientPersona,
    PromptKind, RealismAssessment,
};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Asks the model whether a mood is realistic for a persona in a session
pub struct PersonaMoodValidator {
    model: Arc<dyn LanguageModel>,
    templates: Arc<TemplateEngine>,
    params: GenerationParams,
}

impl PersonaMoodValidator {
    /// Create a validator
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

    /// Score the combination; model failures propagate unchanged
    #[instrument(skip_all, fields(persona = %persona.id, context = %context.id, mood = %mood))]
    pub async fn validate(
        &self,
        persona: &PatientPersona,
        mood: &str,
        context: &ConversationContext,
    ) -> Result<RealismAssessment> {
        let data = persona_prompt_data(persona, mood, context);
        let prompt = self
            .templates
            .render_prompt(PromptKind::MoodValidation, &data)?;

        let response = self
            .model
            .complete(CompletionRequest::new(
                PromptKind::MoodValidation,
                prompt,
                self.params.clone(),
            ))
            .await?;

        let assessment = parse_assessment(&response)?;
        debug!(score = assessment.score, "Persona-mood combination scored");
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MockLanguageModel;
    use crate::PatsimError;

    fn fixtures() -> (PatientPersona, ConversationContext) {
        (
            PatientPersona::new("kim", "Kim", "New parent").with_traits(["anxious"]),
            ConversationContext::new("s1", 2, "CBT", "Sleep"),
        )
    }

    #[tokio::test]
    async fn test_validate_parses_assessment() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|req| {
                req.kind == PromptKind::MoodValidation
                    && req.prompt.contains("Name: Kim")
                    && req.prompt.contains("exhausted but hopeful")
            })
            .times(1)
            .returning(|_| {
                Ok("<realism_score>0.85</realism_score><explanation>Plausible for a new parent</explanation>"
                    .to_string())
            });

        let validator = PersonaMoodValidator::new(
            Arc::new(model),
            Arc::new(TemplateEngine::new().unwrap()),
            GenerationParams::default(),
        );
        let (persona, context) = fixtures();
        let assessment = validator
            .validate(&persona, "exhausted but hopeful", &context)
            .await
            .unwrap();

        assert_eq!(assessment.score, 0.85);
        assert_eq!(assessment.explanation, "Plausible for a new parent");
        assert!(assessment.suggestions.is_none());
    }

    #[tokio::test]
    async fn test_validate_propagates_model_failure() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Err(PatsimError::rate_limit("429 Too Many Requests")));

        let validator = PersonaMoodValidator::new(
            Arc::new(model),
            Arc::new(TemplateEngine::new().unwrap()),
            GenerationParams::default(),
        );
        let (persona, context) = fixtures();
        let err = validator
            .validate(&persona, "calm", &context)
            .await
            .unwrap_err();
        assert!(matches!(err, PatsimError::RateLimit(_)));
    }
}
