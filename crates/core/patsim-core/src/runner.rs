//! Batch generation of datapoints into an output sink

use crate::catalog::Catalog;
use crate::selection::SelectionStrategy;
use crate::types::{OutputRecord, OutputSink, WorkflowStatus};
use crate::workflow::PatientReplyWorkflow;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

/// Batch runner options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerOptions {
    /// Datapoints to generate
    pub count: usize,

    /// Stop at the first failed datapoint instead of skipping it
    pub fail_fast: bool,

    /// Answer this statement instead of selecting one from the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapist_statement: Option<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            count: 20,
            fail_fast: false,
            therapist_statement: None,
        }
    }
}

/// Counters reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Identifier stamped on every row of this run
    pub run_id: Uuid,
    /// Datapoints requested
    pub requested: usize,
    /// Rows appended to the sink
    pub written: usize,
    /// Rows whose reply reached the threshold
    pub accepted: usize,
    /// Rows written with a below-threshold reply
    pub exhausted: usize,
    /// Datapoints skipped after a workflow error
    pub failed: usize,
}

impl RunSummary {
    fn new(run_id: Uuid, requested: usize) -> Self {
        Self {
            run_id,
            requested,
            written: 0,
            accepted: 0,
            exhausted: 0,
            failed: 0,
        }
    }
}

/// Select, generate and record `count` datapoints, one after another
pub struct BatchRunner<S, K> {
    catalog: Catalog,
    workflow: PatientReplyWorkflow,
    selector: S,
    sink: K,
    options: RunnerOptions,
    run_id: Uuid,
}

impl<S: SelectionStrategy, K: OutputSink> BatchRunner<S, K> {
    /// Create a runner with default options
    pub fn new(catalog: Catalog, workflow: PatientReplyWorkflow, selector: S, sink: K) -> Self {
        Self {
            catalog,
            workflow,
            selector,
            sink,
            options: RunnerOptions::default(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Identifier stamped on this run's rows
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The sink rows are written to
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Consume the runner and return its sink
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Generate every requested datapoint
    ///
    /// Workflow errors are logged and counted unless `fail_fast` is set, in
    /// which case the first one is returned. Sink errors always abort.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let count = self.options.count;
        let mut summary = RunSummary::new(self.run_id, count);
        info!(run_id = %self.run_id, count, "Starting generation run");

        for sequence in 1..=count {
            info!("Datapoint {} out of {}", sequence, count);

            let mut selection = self.selector.select(&self.catalog);
            if let Some(statement) = &self.options.therapist_statement {
                selection.therapist_statement = statement.as_str();
            }

            let outcome = match self.workflow.run(&selection).await {
                Ok(outcome) => outcome,
                Err(e) if !self.options.fail_fast => {
                    error!(
                        persona = %selection.persona.id,
                        context = %selection.context.id,
                        model_failure = e.is_model_failure(),
                        "Skipping datapoint {}: {}",
                        sequence,
                        e
                    );
                    summary.failed += 1;
                    continue;
                }
                Err(e) => {
                    self.sink.flush()?;
                    return Err(e);
                }
            };

            let record = OutputRecord::new(
                self.run_id,
                sequence,
                selection.persona,
                selection.mood,
                selection.context,
                selection.therapist_statement,
                &outcome,
            );
            self.sink.append(&record)?;

            summary.written += 1;
            match outcome.status {
                WorkflowStatus::Accepted => summary.accepted += 1,
                WorkflowStatus::Exhausted => summary.exhausted += 1,
            }
        }

        self.sink.flush()?;
        info!(
            written = summary.written,
            accepted = summary.accepted,
            exhausted = summary.exhausted,
            failed = summary.failed,
            "Generation run finished"
        );
        Ok(summary)
    }
}
