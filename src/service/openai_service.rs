use async_trait::async_trait;

use crate::clients::openai_client::{self, CompletionTarget, SecretString};
use crate::clients::retry::RetryConfig;
use crate::error::ModelError;
use crate::models::message::{Message, ToolDefinition};

/// The language-model seam: full history in, one assistant message out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
    ) -> Result<Message, ModelError>;
}

pub struct OpenAIService {
    http: reqwest::Client,
    target: CompletionTarget,
    retry_config: RetryConfig,
}

impl OpenAIService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            target: CompletionTarget {
                api_key: SecretString::new(api_key),
                model,
                base_url,
            },
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn model(&self) -> &str {
        &self.target.model
    }
}

#[async_trait]
impl ChatModel for OpenAIService {
    async fn complete(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
    ) -> Result<Message, ModelError> {
        tracing::debug!(
            model = %self.target.model,
            history = messages.len(),
            "requesting chat completion"
        );
        openai_client::create_chat_completion(
            &self.http,
            &self.target,
            &self.retry_config,
            system,
            messages,
            tools,
        )
        .await
    }
}
