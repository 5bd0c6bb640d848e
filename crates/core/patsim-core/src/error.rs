//! Error types for PatSim core

use thiserror::Error;

/// Main error type for PatSim operations
#[derive(Debug, Error)]
pub enum PatsimError {
    /// Model/LLM call failed (network, rate limit, provider-side error)
    #[error("Model error: {0}")]
    Model(String),

    /// Model answered, but not in the shape the prompt asked for
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// Output sink error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Rate limit error
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Missing required field
    #[error("Missing required field '{field}' in {context}. {suggestion}")]
    MissingField {
        /// Field name
        field: String,
        /// Context where field is missing
        context: String,
        /// Suggestion for fixing
        suggestion: String,
    },
}

/// Convenient Result type using PatsimError
pub type Result<T> = std::result::Result<T, PatsimError>;

impl PatsimError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        PatsimError::Model(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        PatsimError::MalformedResponse(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        PatsimError::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        PatsimError::Validation(msg.into())
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        PatsimError::Template(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        PatsimError::Storage(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(msg: impl Into<String>) -> Self {
        PatsimError::RateLimit(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        PatsimError::Timeout(msg.into())
    }

    /// Create a missing field error
    pub fn missing_field(
        field: impl Into<String>,
        context: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        PatsimError::MissingField {
            field: field.into(),
            context: context.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Whether the failure came from the model collaborator rather than local code
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            PatsimError::Model(_)
                | PatsimError::MalformedResponse(_)
                | PatsimError::Network(_)
                | PatsimError::RateLimit(_)
                | PatsimError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PatsimError::model("connection reset");
        assert_eq!(err.to_string(), "Model error: connection reset");

        let err = PatsimError::malformed("no <realism_score> tag");
        assert_eq!(
            err.to_string(),
            "Malformed model response: no <realism_score> tag"
        );
    }

    #[test]
    fn test_missing_field_message() {
        let err = PatsimError::missing_field(
            "api_key",
            "OpenAI provider",
            "Set OPENAI_API_KEY or pass --api-key",
        );
        assert_eq!(
            err.to_string(),
            "Missing required field 'api_key' in OpenAI provider. Set OPENAI_API_KEY or pass --api-key"
        );
    }

    #[test]
    fn test_model_failure_classification() {
        assert!(PatsimError::rate_limit("429").is_model_failure());
        assert!(PatsimError::malformed("empty").is_model_failure());
        assert!(!PatsimError::config("bad threshold").is_model_failure());
        assert!(!PatsimError::storage("disk full").is_model_failure());
    }
}
