//! Configuration management and environment variable loading

use crate::types::GenerationParams;
use crate::{PatsimError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Default realism threshold an attempt must reach to be accepted
pub const DEFAULT_REALISM_THRESHOLD: f32 = 0.7;

/// Default number of generate-then-evaluate attempts per datapoint
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Load environment variables from .env file
///
/// Looks in the current directory and its parents. A missing file is not
/// an error; a file that fails to parse is.
///
/// # Example
///
/// ```no_run
/// use patsim_core::load_env;
///
/// load_env().ok();
/// let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
/// ```
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(PatsimError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(PatsimError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Load environment variables from a specific file
pub fn load_env_from_path<P: AsRef<Path>>(path: P) -> Result<()> {
    match dotenvy::from_path(path.as_ref()) {
        Ok(_) => {
            tracing::info!("Loaded environment from: {}", path.as_ref().display());
            Ok(())
        }
        Err(e) => Err(PatsimError::config(format!(
            "Failed to load {} environment file: {}",
            path.as_ref().display(),
            e
        ))),
    }
}

/// Get required environment variable
pub fn get_required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| {
        PatsimError::config(format!(
            "Required environment variable '{}' is not set. \
             Check your .env file or system environment.",
            key
        ))
    })
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Get environment variable as float
pub fn get_env_float(key: &str, default: f32) -> f32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(default)
}

/// Settings for the bounded-retry reply workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// Minimum evaluator score for a reply to be accepted
    pub realism_threshold: f32,

    /// Upper bound on reply generation calls per datapoint
    pub max_attempts: usize,

    /// Parameters forwarded with every completion request
    #[serde(default)]
    pub generation: GenerationParams,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            realism_threshold: DEFAULT_REALISM_THRESHOLD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            generation: GenerationParams {
                model: Some(DEFAULT_MODEL.to_string()),
                ..Default::default()
            },
        }
    }
}

impl WorkflowConfig {
    /// Build a config from `PATSIM_*` / `OPENAI_MODEL` environment variables
    ///
    /// Unset or unparsable values fall back to the defaults; the result is
    /// validated before it is returned.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            realism_threshold: get_env_float(
                "PATSIM_REALISM_THRESHOLD",
                defaults.realism_threshold,
            ),
            max_attempts: get_env_int("PATSIM_MAX_ATTEMPTS", defaults.max_attempts),
            generation: GenerationParams {
                model: Some(get_env_or("OPENAI_MODEL", DEFAULT_MODEL)),
                temperature: env::var("PATSIM_TEMPERATURE")
                    .ok()
                    .and_then(|v| v.parse::<f32>().ok()),
                max_tokens: env::var("PATSIM_MAX_TOKENS")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok()),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside [0, 1], zero attempts and out-of-range temperatures
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.realism_threshold) {
            return Err(PatsimError::config(format!(
                "realism_threshold must be within [0, 1], got {}",
                self.realism_threshold
            )));
        }
        if self.max_attempts == 0 {
            return Err(PatsimError::config("max_attempts must be at least 1"));
        }
        if let Some(temperature) = self.generation.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(PatsimError::config(format!(
                    "temperature must be within [0, 2], got {}",
                    temperature
                )));
            }
        }
        Ok(())
    }
}
