//! OpenAI chat completion backend for PatSim

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use patsim_core::{
    get_env_int, get_env_or, get_required_env, CompletionRequest, LanguageModel, PatsimError,
    Result, DEFAULT_MODEL,
};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for [`OpenAIModel`]
#[derive(Clone)]
pub struct OpenAIModelConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Model used when a request does not name one
    pub model: String,
    /// Alternative API base for OpenAI-compatible servers
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAIModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIModelConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAIModelConfig {
    /// Settings for the given key with default model and timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL` and `OPENAI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = get_required_env("OPENAI_API_KEY")?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        Ok(Self {
            api_key,
            model: get_env_or("OPENAI_MODEL", DEFAULT_MODEL),
            base_url,
            timeout: Duration::from_secs(get_env_int("OPENAI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// Set the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`LanguageModel`] backed by the OpenAI chat completions API
pub struct OpenAIModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIModel {
    /// Build a client from connection settings
    pub fn new(config: OpenAIModelConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PatsimError::missing_field(
                "api_key",
                "OpenAI model configuration",
                "set OPENAI_API_KEY or pass --api-key",
            ));
        }
        if config.model.trim().is_empty() {
            return Err(PatsimError::config("OpenAI model name must not be empty"));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key);
        if let Some(base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        debug!(model = %config.model, "Initializing OpenAI client");

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http_client),
            model: config.model,
        })
    }

    /// Build a client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIModelConfig::from_env()?)
    }

    /// Default model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> Result<CreateChatCompletionRequest> {
        let model = request
            .params
            .model
            .clone()
            .unwrap_or_else(|| self.model.clone());

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(model);
        request_builder.messages(vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(|e| PatsimError::model(e.to_string()))?,
        )]);

        if let Some(temp) = request.params.temperature {
            request_builder.temperature(temp);
        }

        if let Some(max_tokens) = request.params.max_tokens {
            request_builder.max_tokens(max_tokens);
        }

        request_builder.stream(true);
        request_builder
            .build()
            .map_err(|e| PatsimError::model(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip_all, fields(kind = %request.kind))]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let start_time = Instant::now();
        let chat_request = self.build_request(&request)?;
        let model = chat_request.model.clone();

        let mut stream = self
            .client
            .chat()
            .create_stream(chat_request)
            .await
            .map_err(map_openai_error)?;

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let resp = chunk.map_err(map_openai_error)?;
            if let Some(content) = resp
                .choices
                .first()
                .and_then(|c| c.delta.content.as_deref())
            {
                text.push_str(content);
            }
        }

        debug!(
            model = %model,
            latency_ms = start_time.elapsed().as_millis() as u64,
            chars = text.len(),
            "Completion finished"
        );

        if text.trim().is_empty() {
            return Err(PatsimError::model(format!("{} returned an empty completion", model)));
        }
        Ok(text)
    }
}

fn map_openai_error(err: OpenAIError) -> PatsimError {
    match &err {
        OpenAIError::Reqwest(e) if e.is_timeout() => PatsimError::timeout(e.to_string()),
        OpenAIError::ApiError(api) if is_rate_limit(&api.message) => {
            PatsimError::rate_limit(api.message.clone())
        }
        _ => {
            let message = err.to_string();
            if is_rate_limit(&message) {
                PatsimError::rate_limit(message)
            } else {
                PatsimError::model(message)
            }
        }
    }
}

fn is_rate_limit(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("rate limit") || lowered.contains("429")
}
