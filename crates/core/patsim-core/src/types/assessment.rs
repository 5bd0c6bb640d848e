//! Scores and workflow results

use serde::{Deserialize, Serialize};

/// Model-produced realism judgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealismAssessment {
    /// Realism score in [0, 1]
    pub score: f32,

    /// Why the score was given
    pub explanation: String,

    /// Suggested adjustments or improvements, if the model offered any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
}

impl RealismAssessment {
    /// Whether the score reaches `threshold`
    pub fn meets(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// A generated reply together with its evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Patient reply text
    pub reply: String,

    /// Evaluator score of `reply`
    pub realism_score: f32,

    /// Evaluator explanation for `reply`
    pub explanation: String,

    /// Improvement suggestions from the evaluator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,

    /// 1-based attempt that produced this reply
    pub attempt: usize,
}

impl GenerationResult {
    /// Pair a reply with the assessment made of it
    pub fn from_assessment(reply: String, assessment: RealismAssessment, attempt: usize) -> Self {
        Self {
            reply,
            realism_score: assessment.score,
            explanation: assessment.explanation,
            suggestions: assessment.suggestions,
            attempt,
        }
    }
}

/// Terminal state of the bounded-retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// An attempt reached the realism threshold
    Accepted,
    /// Every attempt fell short; the best one is returned
    Exhausted,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Accepted => write!(f, "accepted"),
            WorkflowStatus::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Everything one workflow invocation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutcome {
    /// Returned reply
    pub result: GenerationResult,

    /// Accepted or exhausted
    pub status: WorkflowStatus,

    /// Number of generate-then-evaluate cycles performed
    pub attempts: usize,

    /// Persona-mood validation done before generation
    pub mood_assessment: RealismAssessment,
}

impl WorkflowOutcome {
    /// Whether the returned reply is below threshold
    pub fn is_low_realism(&self) -> bool {
        self.status == WorkflowStatus::Exhausted
    }
}
