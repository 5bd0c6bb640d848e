//! Output rows and the sink they are appended to

use super::{ConversationContext, PatientPersona, WorkflowOutcome, WorkflowStatus};
use crate::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated datapoint as written to the output sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Batch run this row belongs to
    pub run_id: Uuid,
    /// 1-based position within the run
    pub sequence: usize,
    /// RFC 3339 creation time
    pub generated_at: String,
    /// Persona identifier
    pub persona_id: String,
    /// Mood label
    pub mood: String,
    /// Context identifier
    pub context_id: String,
    /// Therapist line the reply answers
    pub therapist_statement: String,
    /// Returned patient reply
    pub reply: String,
    /// Evaluator score of the reply
    pub realism_score: f32,
    /// Evaluator explanation
    pub explanation: String,
    /// Accepted or exhausted
    pub status: WorkflowStatus,
    /// Attempts used
    pub attempts: usize,
    /// Persona-mood validation score
    pub mood_score: f32,
    /// Persona traits joined with "; "
    pub personality_traits: String,
}

impl OutputRecord {
    /// Flatten a workflow outcome and the inputs it was produced from
    pub fn new(
        run_id: Uuid,
        sequence: usize,
        persona: &PatientPersona,
        mood: &str,
        context: &ConversationContext,
        therapist_statement: &str,
        outcome: &WorkflowOutcome,
    ) -> Self {
        Self {
            run_id,
            sequence,
            generated_at: chrono::Utc::now().to_rfc3339(),
            persona_id: persona.id.clone(),
            mood: mood.to_string(),
            context_id: context.id.clone(),
            therapist_statement: therapist_statement.to_string(),
            reply: outcome.result.reply.clone(),
            realism_score: outcome.result.realism_score,
            explanation: outcome.result.explanation.clone(),
            status: outcome.status,
            attempts: outcome.attempts,
            mood_score: outcome.mood_assessment.score,
            personality_traits: persona.personality_traits.join("; "),
        }
    }
}

/// Append-only destination for generated rows
pub trait OutputSink: Send {
    /// Append one row
    fn append(&mut self, record: &OutputRecord) -> Result<()>;

    /// Flush buffered rows to durable storage
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        (**self).append(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
