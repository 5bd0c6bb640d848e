//! Test doubles for the model collaborator and the output sink

use crate::types::{CompletionRequest, LanguageModel, OutputRecord, OutputSink, PromptKind};
use crate::{PatsimError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Fail(String),
}

/// Language model answering from per-prompt-kind queues
///
/// Queued responses are consumed first; once a queue is empty the kind's
/// fallback (if any) is returned on every call. Without either the call
/// fails with a model error.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    queues: Mutex<HashMap<PromptKind, VecDeque<Scripted>>>,
    fallbacks: Mutex<HashMap<PromptKind, Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one mood validation plus one generate/evaluate pair per score
    ///
    /// Replies read `Patient: reply N` and explanations `explanation N`,
    /// N being the 1-based attempt.
    pub fn with_reply_scores(mood_score: f32, scores: &[f32]) -> Self {
        let model = Self::new();
        model.set_fallback(PromptKind::MoodValidation, assessment(mood_score, "mood explanation"));
        for (i, score) in scores.iter().enumerate() {
            let n = i + 1;
            model.push(
                PromptKind::ReplyGeneration,
                format!("<patient_reply>Patient: reply {}</patient_reply>", n),
            );
            model.push(
                PromptKind::ReplyEvaluation,
                assessment(*score, &format!("explanation {}", n)),
            );
        }
        model
    }

    /// Queue a response for a prompt kind
    pub fn push(&self, kind: PromptKind, response: impl Into<String>) {
        self.lock_queues()
            .entry(kind)
            .or_default()
            .push_back(Scripted::Text(response.into()));
    }

    /// Queue a model failure for a prompt kind
    pub fn push_failure(&self, kind: PromptKind, message: impl Into<String>) {
        self.lock_queues()
            .entry(kind)
            .or_default()
            .push_back(Scripted::Fail(message.into()));
    }

    /// Response returned whenever the kind's queue is empty
    pub fn set_fallback(&self, kind: PromptKind, response: impl Into<String>) {
        if let Ok(mut fallbacks) = self.fallbacks.lock() {
            fallbacks.insert(kind, Scripted::Text(response.into()));
        }
    }

    /// Number of calls made for a prompt kind
    pub fn calls(&self, kind: PromptKind) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.kind == kind)
            .count()
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn lock_queues(&self) -> std::sync::MutexGuard<'_, HashMap<PromptKind, VecDeque<Scripted>>> {
        self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let kind = request.kind;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let queued = self.lock_queues().get_mut(&kind).and_then(|q| q.pop_front());
        let scripted = match queued {
            Some(scripted) => Some(scripted),
            None => self
                .fallbacks
                .lock()
                .ok()
                .and_then(|fallbacks| fallbacks.get(&kind).cloned()),
        };

        match scripted {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(PatsimError::model(message)),
            None => Err(PatsimError::model(format!(
                "no scripted response left for {}",
                kind
            ))),
        }
    }
}

/// Tagged assessment response as the evaluator and validator expect it
pub fn assessment(score: f32, explanation: &str) -> String {
    format!(
        "<realism_score>{}</realism_score>\n<explanation>{}</explanation>\n<suggestions>none</suggestions>",
        score, explanation
    )
}

/// Output sink keeping rows in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<OutputRecord>,
    flushes: usize,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows appended so far
    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    /// Number of flush calls
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl OutputSink for MemorySink {
    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationParams;

    #[tokio::test]
    async fn test_scripted_model_queue_then_fallback() {
        let model = ScriptedModel::new();
        model.push(PromptKind::ReplyGeneration, "first");
        model.set_fallback(PromptKind::ReplyGeneration, "again");

        let request =
            CompletionRequest::new(PromptKind::ReplyGeneration, "prompt", GenerationParams::default());
        assert_eq!(model.complete(request.clone()).await.unwrap(), "first");
        assert_eq!(model.complete(request.clone()).await.unwrap(), "again");
        assert_eq!(model.complete(request).await.unwrap(), "again");
        assert_eq!(model.calls(PromptKind::ReplyGeneration), 3);
        assert_eq!(model.calls(PromptKind::ReplyEvaluation), 0);
    }

    #[tokio::test]
    async fn test_scripted_model_failures() {
        let model = ScriptedModel::new();
        model.push_failure(PromptKind::MoodValidation, "503 Service Unavailable");

        let request =
            CompletionRequest::new(PromptKind::MoodValidation, "prompt", GenerationParams::default());
        let err = model.complete(request.clone()).await.unwrap_err();
        assert!(err.to_string().contains("503"));

        let err = model.complete(request).await.unwrap_err();
        assert!(err.to_string().contains("no scripted response left for MOOD_VALIDATION"));
    }
}
