//! Patient reply realism scoring

use crate::parsing::parse_assessment;
use crate::templates::{persona_prompt_data, TemplateEngine};
use crate::types::{
    CompletionRequest, ConversationContext, GenerationParams, LanguageModel, PatientPersona,
    PromptKind, RealismAssessment,
};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Scores how realistic and appropriate a generated reply is
pub struct ReplyEvaluator {
    model: Arc<dyn LanguageModel>,
    templates: Arc<TemplateEngine>,
    params: GenerationParams,
}

impl ReplyEvaluator {
    /// Create an evaluator
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

    /// Score `reply` as an answer to `therapist_statement`
    #[instrument(skip_all, fields(persona = %persona.id, context = %context.id))]
    pub async fn evaluate(
        &self,
        persona: &PatientPersona,
        mood: &str,
        context: &ConversationContext,
        therapist_statement: &str,
        reply: &str,
    ) -> Result<RealismAssessment> {
        let mut data = persona_prompt_data(persona, mood, context);
        data.insert(
            "THERAPIST_STATEMENT".to_string(),
            serde_json::Value::String(therapist_statement.to_string()),
        );
        data.insert(
            "PATIENT_REPLY".to_string(),
            serde_json::Value::String(reply.to_string()),
        );
        let prompt = self
            .templates
            .render_prompt(PromptKind::ReplyEvaluation, &data)?;

        let response = self
            .model
            .complete(CompletionRequest::new(
                PromptKind::ReplyEvaluation,
                prompt,
                self.params.clone(),
            ))
            .await?;

        let assessment = parse_assessment(&response)?;
        debug!(score = assessment.score, "Patient reply scored");
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MockLanguageModel;

    #[tokio::test]
    async fn test_evaluate_includes_reply_in_prompt() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|req| {
                req.kind == PromptKind::ReplyEvaluation
                    && req.prompt.contains("Patient: Fine, I guess. (arms crossed)")
            })
            .times(1)
            .returning(|_| {
                Ok("<realism_score>0.4</realism_score>\
                    <explanation>Too curt for session 8</explanation>\
                    <suggestions>Reference the progress mentioned earlier</suggestions>"
                    .to_string())
            });

        let evaluator = ReplyEvaluator::new(
            Arc::new(model),
            Arc::new(TemplateEngine::new().unwrap()),
            GenerationParams::default(),
        );
        let assessment = evaluator
            .evaluate(
                &PatientPersona::new("kim", "Kim", "New parent"),
                "irritable and restless",
                &ConversationContext::new("s8", 8, "Interpersonal Therapy", "Social support"),
                "How did reaching out to friends go?",
                "Patient: Fine, I guess. (arms crossed)",
            )
            .await
            .unwrap();

        assert_eq!(assessment.score, 0.4);
        assert_eq!(assessment.explanation, "Too curt for session 8");
        assert_eq!(
            assessment.suggestions.as_deref(),
            Some("Reference the progress mentioned earlier")
        );
    }

    #[tokio::test]
    async fn test_unparsable_score_counts_as_zero() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().returning(|_| {
            Ok("<realism_score>quite realistic</realism_score><explanation>ok</explanation>"
                .to_string())
        });

        let evaluator = ReplyEvaluator::new(
            Arc::new(model),
            Arc::new(TemplateEngine::new().unwrap()),
            GenerationParams::default(),
        );
        let assessment = evaluator
            .evaluate(
                &PatientPersona::new("kim", "Kim", "New parent"),
                "calm",
                &ConversationContext::new("s1", 1, "CBT", "Intake"),
                "How are you?",
                "Patient: Okay.",
            )
            .await
            .unwrap();
        assert_eq!(assessment.score, 0.0);
    }
}
