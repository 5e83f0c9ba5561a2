use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use switchboard_common::{Result, SwitchboardError};
use tokio::sync::Semaphore;
use tracing::info;

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::error::LlmError;
use crate::openai::OpenAiClient;
use crate::retry::{RetryConfig, RetryingClient};

/// Connection settings for the classification model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `openai` for any OpenAI-compatible server; `lmstudio` and `ollama`
    /// are accepted as aliases.
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    2
}

impl LlmConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: default_provider(),
            model: model.into(),
            api_key: None,
            api_url: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent(),
            retry: RetryConfig::default(),
        }
    }
}

/// Caps the number of in-flight requests to the inner client.
pub struct SemaphoredClient {
    inner: Arc<dyn LlmClient>,
    semaphore: Semaphore,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Semaphore::new(max_concurrent.max(1)),
        }
    }
}

#[async_trait]
impl LlmClient for SemaphoredClient {
    async fn complete(&self, request: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LlmError::Rejected(format!("client is shutting down: {e}")))?;
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Build the full client stack: provider client, retries, concurrency cap.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    if config.model.trim().is_empty() {
        return Err(SwitchboardError::Config(
            "LLM model name must not be empty".to_string(),
        ));
    }

    let base_client = match config.provider.as_str() {
        "openai" | "lmstudio" | "ollama" => OpenAiClient::with_timeout(
            config.api_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        ),
        other => {
            return Err(SwitchboardError::Config(format!(
                "Unknown LLM provider: {other}"
            )));
        }
    };

    info!(
        provider = %config.provider,
        model = %config.model,
        max_concurrent = config.max_concurrent_requests,
        "Building LLM client"
    );

    let retrying: Arc<dyn LlmClient> =
        Arc::new(RetryingClient::new(base_client, config.retry.clone()));

    Ok(Arc::new(SemaphoredClient::new(
        retrying,
        config.max_concurrent_requests,
    )))
}
