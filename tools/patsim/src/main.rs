//! PatSim command line
//!
//! Generates a batch of patient replies with an OpenAI chat model and
//! appends them to a CSV file.

use anyhow::{bail, Context};
use clap::Parser;
use patsim_core::{
    init_logging, load_env, load_env_from_path, BatchRunner, Catalog, PatientReplyWorkflow,
    RandomSelector, RunSummary, RunnerOptions, WorkflowConfig, DEFAULT_MODEL,
};
use patsim_provider_openai::{OpenAIModel, OpenAIModelConfig, DEFAULT_TIMEOUT_SECS};
use patsim_storage_csv::{CsvSink, DEFAULT_OUTPUT_PATH};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Minimum realism score for a reply to be accepted [env: PATSIM_REALISM_THRESHOLD, default: 0.7]
    #[arg(long)]
    realism_threshold: Option<f32>,

    /// Generate-then-evaluate attempts per datapoint [env: PATSIM_MAX_ATTEMPTS, default: 3]
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Sampling temperature [env: PATSIM_TEMPERATURE]
    #[arg(long)]
    temperature: Option<f32>,

    /// Completion token limit [env: PATSIM_MAX_TOKENS]
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, env = "OPENAI_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Number of datapoints to generate
    #[arg(short = 'n', long, default_value_t = 20)]
    count: usize,

    /// Output CSV file (appended to if it exists)
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Seed for reproducible selection
    #[arg(long)]
    seed: Option<u64>,

    /// JSON catalog replacing the builtin personas, moods, contexts and statements
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Answer this therapist statement in every datapoint
    #[arg(long)]
    therapist_statement: Option<String>,

    /// Stop at the first failed datapoint
    #[arg(long)]
    fail_fast: bool,

    /// Extra environment file to load
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl Cli {
    /// `PATSIM_*` environment settings with explicit flags taking precedence
    fn workflow_config(&self) -> patsim_core::Result<WorkflowConfig> {
        let mut config = WorkflowConfig::from_env()?;
        if let Some(threshold) = self.realism_threshold {
            config.realism_threshold = threshold;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if self.temperature.is_some() {
            config.generation.temperature = self.temperature;
        }
        if self.max_tokens.is_some() {
            config.generation.max_tokens = self.max_tokens;
        }
        config.generation.model = Some(self.model.clone());
        config.validate()?;
        Ok(config)
    }

    fn model_config(&self) -> OpenAIModelConfig {
        let mut config = OpenAIModelConfig::new(self.api_key.clone().unwrap_or_default())
            .with_model(self.model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        config
    }

    fn runner_options(&self) -> anyhow::Result<RunnerOptions> {
        let therapist_statement = match &self.therapist_statement {
            Some(statement) if statement.trim().is_empty() => {
                bail!("--therapist-statement must not be empty")
            }
            Some(statement) => Some(statement.trim().to_string()),
            None => None,
        };
        Ok(RunnerOptions {
            count: self.count,
            fail_fast: self.fail_fast,
            therapist_statement,
        })
    }
}

fn print_summary(summary: &RunSummary, output: &std::path::Path) {
    println!("Run {}", summary.run_id);
    println!("  requested: {}", summary.requested);
    println!("  written:   {}", summary.written);
    println!("  accepted:  {}", summary.accepted);
    println!("  low realism: {}", summary.exhausted);
    println!("  failed:    {}", summary.failed);
    println!("Output: {}", output.display());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env()?;
    let mut cli = Cli::parse();
    if let Some(path) = cli.env_file.clone() {
        load_env_from_path(&path)?;
        cli = Cli::parse();
    }

    init_logging();

    let config = cli.workflow_config()?;
    let options = cli.runner_options()?;

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_json_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };

    let model = Arc::new(OpenAIModel::new(cli.model_config())?);
    let workflow = PatientReplyWorkflow::new(model, config)?;

    let selector = match cli.seed {
        Some(seed) => RandomSelector::seeded(seed),
        None => RandomSelector::from_entropy(),
    };

    let sink = CsvSink::open(&cli.output)
        .with_context(|| format!("opening output file {}", cli.output.display()))?;

    info!(
        model = %cli.model,
        threshold = workflow.config().realism_threshold,
        max_attempts = workflow.config().max_attempts,
        "Generating {} datapoints",
        cli.count
    );

    let mut runner = BatchRunner::new(catalog, workflow, selector, sink).with_options(options);
    let summary = runner.run().await?;

    print_summary(&summary, &cli.output);
    Ok(())
}
