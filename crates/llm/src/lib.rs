//! Chat-completion clients used by the learned intent classifier.

pub mod client;
pub mod config;
pub mod error;
pub mod openai;
pub mod retry;

pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};
pub use config::{build_llm_client, LlmConfig, SemaphoredClient};
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use retry::{RetryConfig, RetryingClient};
