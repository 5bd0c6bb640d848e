//! PatSim Core
//!
//! Generates synthetic patient replies for simulated therapy dialogues. A
//! persona, a mood, a session context and a therapist statement go in; a
//! patient reply scored for realism comes out. It includes:
//!
//! - Patient personas, session contexts and a builtin catalog
//! - Prompt templates for mood validation, reply generation and evaluation
//! - Parsing of tagged model responses into realism assessments
//! - A bounded-retry generate-then-evaluate workflow
//! - A batch runner writing rows to any [`OutputSink`]
//!
//! # Example
//!
//! ```no_run
//! use patsim_core::*;
//! use std::sync::Arc;
//!
//! # async fn demo(model: Arc<dyn LanguageModel>) -> Result<()> {
//! let workflow = PatientReplyWorkflow::new(model, WorkflowConfig::default())?;
//! let catalog = Catalog::builtin();
//! let mut selector = RandomSelector::seeded(7);
//! let outcome = workflow.run(&selector.select(&catalog)).await?;
//! println!("{} ({:.2})", outcome.result.reply, outcome.result.realism_score);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub use uuid::Uuid;

pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod parsing;
pub mod runner;
pub mod selection;
pub mod templates;
pub mod testing;
pub mod types;
pub mod utils;
pub mod validator;
pub mod workflow;

pub use catalog::Catalog;
pub use config::{
    get_env_float, get_env_int, get_env_or, get_required_env, load_env, load_env_from_path,
    WorkflowConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL, DEFAULT_REALISM_THRESHOLD,
};
pub use error::{PatsimError, Result};
pub use evaluator::ReplyEvaluator;
pub use generator::ReplyGenerator;
pub use parsing::{extract_xml_tag, parse_assessment, parse_reply, parse_score};
pub use runner::{BatchRunner, RunSummary, RunnerOptions};
pub use selection::{RandomSelector, Selection, SelectionStrategy};
pub use templates::{persona_prompt_data, TemplateEngine};
pub use testing::{MemorySink, ScriptedModel};
pub use types::*;
pub use utils::init_logging;
pub use validator::PersonaMoodValidator;
pub use workflow::PatientReplyWorkflow;
