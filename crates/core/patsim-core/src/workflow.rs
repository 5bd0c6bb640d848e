//! Bounded-retry generate-then-evaluate workflow
//!
//! One invocation:
//!
//! 1. Scores the persona-mood combination once. A low score is logged as a
//!    warning and never stops generation.
//! 2. Generates a reply and evaluates it, up to `max_attempts` times.
//!    The first reply scoring at or above `realism_threshold` is returned
//!    as [`WorkflowStatus::Accepted`] and no further calls are made.
//! 3. If no attempt reaches the threshold, the highest-scoring attempt is
//!    returned as [`WorkflowStatus::Exhausted`]. On ties the earlier attempt
//!    is kept.
//!
//! Model failures abort the invocation and are returned to the caller.

use crate::config::WorkflowConfig;
use crate::evaluator::ReplyEvaluator;
use crate::generator::ReplyGenerator;
use crate::selection::Selection;
use crate::templates::TemplateEngine;
use crate::types::{
    ConversationContext, GenerationResult, LanguageModel, PatientPersona, WorkflowOutcome,
    WorkflowStatus,
};
use crate::validator::PersonaMoodValidator;
use crate::{PatsimError, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Sequences validation, generation and evaluation for one datapoint
pub struct PatientReplyWorkflow {
    config: WorkflowConfig,
    validator: PersonaMoodValidator,
    generator: ReplyGenerator,
    evaluator: ReplyEvaluator,
}

impl PatientReplyWorkflow {
    /// Create a workflow using the default prompt templates
    pub fn new(model: Arc<dyn LanguageModel>, config: WorkflowConfig) -> Result<Self> {
        Self::with_templates(model, config, TemplateEngine::new()?)
    }

    /// Create a workflow with custom prompt templates
    pub fn with_templates(
        model: Arc<dyn LanguageModel>,
        config: WorkflowConfig,
        templates: TemplateEngine,
    ) -> Result<Self> {
        config.validate()?;
        let templates = Arc::new(templates);
        let params = config.generation.clone();

        Ok(Self {
            validator: PersonaMoodValidator::new(model.clone(), templates.clone(), params.clone()),
            generator: ReplyGenerator::new(model.clone(), templates.clone(), params.clone()),
            evaluator: ReplyEvaluator::new(model, templates, params),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the workflow for a selected combination
    pub async fn run(&self, selection: &Selection<'_>) -> Result<WorkflowOutcome> {
        self.generate_patient_reply(
            selection.persona,
            selection.mood,
            selection.context,
            selection.therapist_statement,
        )
        .await
    }

    /// Generate, score and retry until a reply is realistic enough or attempts run out
    #[instrument(skip_all, fields(persona = %persona.id, context = %context.id, mood = %mood))]
    pub async fn generate_patient_reply(
        &self,
        persona: &PatientPersona,
        mood: &str,
        context: &ConversationContext,
        therapist_statement: &str,
    ) -> Result<WorkflowOutcome> {
        let threshold = self.config.realism_threshold;

        let mood_assessment = self.validator.validate(persona, mood, context).await?;
        if !mood_assessment.meets(threshold) {
            warn!(
                "Persona-mood combination may not be realistic. Score: {:.2}",
                mood_assessment.score
            );
            warn!("Explanation: {}", mood_assessment.explanation);
            if let Some(adjustments) = &mood_assessment.suggestions {
                warn!("Suggested adjustments: {}", adjustments);
            }
        }

        let mut best: Option<GenerationResult> = None;

        for attempt in 1..=self.config.max_attempts {
            let reply = self
                .generator
                .generate(persona, mood, context, therapist_statement)
                .await?;
            let assessment = self
                .evaluator
                .evaluate(persona, mood, context, therapist_statement, &reply)
                .await?;
            let result = GenerationResult::from_assessment(reply, assessment, attempt);

            if result.realism_score >= threshold {
                info!(
                    attempt,
                    score = result.realism_score,
                    "Reply accepted"
                );
                return Ok(WorkflowOutcome {
                    result,
                    status: WorkflowStatus::Accepted,
                    attempts: attempt,
                    mood_assessment,
                });
            }

            warn!(
                "Attempt {}: Reply not realistic enough. Score: {:.2}",
                attempt, result.realism_score
            );
            warn!("Explanation: {}", result.explanation);
            if let Some(improvements) = &result.suggestions {
                warn!("Improvement suggestions: {}", improvements);
            }

            let keep_previous = matches!(&best, Some(b) if b.realism_score >= result.realism_score);
            if !keep_previous {
                best = Some(result);
            }
        }

        let result = best.ok_or_else(|| PatsimError::config("max_attempts must be at least 1"))?;
        warn!(
            "Low realism: no reply reached {:.2} after {} attempts; keeping attempt {} (score {:.2})",
            threshold, self.config.max_attempts, result.attempt, result.realism_score
        );

        Ok(WorkflowOutcome {
            result,
            status: WorkflowStatus::Exhausted,
            attempts: self.config.max_attempts,
            mood_assessment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use crate::types::{MockLanguageModel, PromptKind};

    fn persona() -> PatientPersona {
        PatientPersona::new("alex", "Alex", "Recently divorced").with_age(28)
    }

    fn context() -> ConversationContext {
        ConversationContext::new("ctx-01", 3, "Cognitive Behavioral Therapy", "Work stress")
    }

    fn config(threshold: f32, max_attempts: usize) -> WorkflowConfig {
        WorkflowConfig {
            realism_threshold: threshold,
            max_attempts,
            ..Default::default()
        }
    }

    async fn run(model: &Arc<ScriptedModel>, threshold: f32, max_attempts: usize) -> Result<WorkflowOutcome> {
        let workflow = PatientReplyWorkflow::new(model.clone(), config(threshold, max_attempts))?;
        workflow
            .generate_patient_reply(&persona(), "anxious and slightly defensive", &context(), "How was your week?")
            .await
    }

    #[tokio::test]
    async fn test_all_attempts_below_threshold() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[0.3, 0.5, 0.6]));
        let outcome = run(&model, 0.7, 3).await.unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Exhausted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result.realism_score, 0.6);
        assert_eq!(outcome.result.attempt, 3);
        assert_eq!(outcome.result.reply, "Patient: reply 3");
        assert!(outcome.is_low_realism());
        assert_eq!(model.calls(PromptKind::ReplyGeneration), 3);
        assert_eq!(model.calls(PromptKind::ReplyEvaluation), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_accepted_attempt() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[0.2, 0.8, 0.95]));
        let outcome = run(&model, 0.7, 3).await.unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Accepted);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.result.realism_score, 0.8);
        assert_eq!(outcome.result.reply, "Patient: reply 2");
        assert_eq!(model.calls(PromptKind::ReplyGeneration), 2);
        assert_eq!(model.calls(PromptKind::ReplyEvaluation), 2);
    }

    #[tokio::test]
    async fn test_keeps_highest_scoring_attempt() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[0.6, 0.4, 0.5]));
        let outcome = run(&model, 0.7, 3).await.unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Exhausted);
        assert_eq!(outcome.result.attempt, 1);
        assert_eq!(outcome.result.reply, "Patient: reply 1");
        assert_eq!(outcome.result.realism_score, 0.6);
        assert_eq!(outcome.result.explanation, "explanation 1");
    }

    #[tokio::test]
    async fn test_tie_keeps_earlier_attempt() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[0.5, 0.5]));
        let outcome = run(&model, 0.7, 2).await.unwrap();
        assert_eq!(outcome.result.attempt, 1);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[0.7]));
        let outcome = run(&model, 0.7, 3).await.unwrap();
        assert_eq!(outcome.status, WorkflowStatus::Accepted);
        assert_eq!(model.calls(PromptKind::ReplyGeneration), 1);
    }

    #[tokio::test]
    async fn test_low_mood_score_does_not_block_generation() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.1, &[0.9]));
        let outcome = run(&model, 0.7, 3).await.unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Accepted);
        assert_eq!(outcome.mood_assessment.score, 0.1);
        assert_eq!(model.calls(PromptKind::MoodValidation), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_budget() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[0.2]));
        let outcome = run(&model, 0.7, 1).await.unwrap();
        assert_eq!(outcome.status, WorkflowStatus::Exhausted);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(model.calls(PromptKind::ReplyGeneration), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let model = Arc::new(ScriptedModel::with_reply_scores(0.9, &[]));
        assert!(PatientReplyWorkflow::new(model.clone(), config(0.7, 0)).is_err());
        assert!(PatientReplyWorkflow::new(model, config(1.2, 3)).is_err());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates_without_more_calls() {
        let mut model = MockLanguageModel::new();
        let mut seq = mockall::Sequence::new();
        model
            .expect_complete()
            .withf(|req| req.kind == PromptKind::MoodValidation)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("<realism_score>0.8</realism_score>".to_string()));
        model
            .expect_complete()
            .withf(|req| req.kind == PromptKind::ReplyGeneration)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(PatsimError::model("connection reset by peer")));

        let workflow = PatientReplyWorkflow::new(Arc::new(model), config(0.7, 3)).unwrap();
        let err = workflow
            .generate_patient_reply(&persona(), "calm and reflective", &context(), "Go on.")
            .await
            .unwrap_err();
        assert!(matches!(err, PatsimError::Model(_)));
    }

    #[tokio::test]
    async fn test_mood_validation_failure_propagates() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Ok("I think this is fine.".to_string()));

        let workflow = PatientReplyWorkflow::new(Arc::new(model), config(0.7, 3)).unwrap();
        let err = workflow
            .generate_patient_reply(&persona(), "calm and reflective", &context(), "Go on.")
            .await
            .unwrap_err();
        assert!(matches!(err, PatsimError::MalformedResponse(_)));
    }
}
