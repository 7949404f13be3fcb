use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::clients::retry::{self, AttemptOutcome, RetryConfig};
use crate::error::ModelError;
use crate::models::message::{Message, Role, ToolCallRequest, ToolDefinition};

/// Redacts its value in Debug and Display output.
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct OpenAIMessage {
    role: String,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAIMessage,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Where and as whom to send chat completion requests.
#[derive(Debug, Clone)]
pub struct CompletionTarget {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl CompletionTarget {
    pub fn endpoint(&self) -> String {
        let base = self
            .base_url
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .trim_end_matches('/');
        format!("{}/v1/chat/completions", base)
    }
}

pub(crate) fn to_wire_messages(system: Option<&str>, messages: &[Message]) -> Vec<OpenAIMessage> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system {
        wire.push(OpenAIMessage {
            role: "system".to_string(),
            content: Some(system.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });
    }
    for message in messages {
        let content = if message.role == Role::Assistant
            && message.has_tool_calls()
            && message.content.is_empty()
        {
            None
        } else {
            Some(message.content.clone())
        };
        wire.push(OpenAIMessage {
            role: message.role.as_str().to_string(),
            content,
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| OpenAIToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: OpenAIFunction {
                        name: call.name.clone(),
                        arguments: Value::Object(call.arguments.clone()).to_string(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        });
    }
    wire
}

pub(crate) fn from_wire_message(message: OpenAIMessage) -> Message {
    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to parse tool arguments JSON for tool '{}': {}",
                    call.function.name,
                    e
                );
                Value::Null
            });
            ToolCallRequest::new(call.id, call.function.name, arguments)
        })
        .collect();
    Message::assistant(message.content.as_deref().unwrap_or(""), tool_calls)
}

pub async fn create_chat_completion(
    http: &reqwest::Client,
    target: &CompletionTarget,
    retry_config: &RetryConfig,
    system: Option<&str>,
    messages: &[Message],
    tools: &[ToolDefinition],
) -> Result<Message, ModelError> {
    let request = OpenAIRequest {
        model: &target.model,
        messages: to_wire_messages(system, messages),
        tools: tools
            .iter()
            .map(|function| OpenAITool {
                kind: "function",
                function,
            })
            .collect(),
        max_tokens: 1500,
        temperature: 0.0,
    };
    let url = target.endpoint();

    let text = retry::with_retry(
        retry_config,
        |_attempt| {
            let request = &request;
            let url = &url;
            async move {
                let response = match http
                    .post(url.as_str())
                    .bearer_auth(target.api_key.expose())
                    .json(request)
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(err) if retry::is_transient(&err) => {
                        return AttemptOutcome::Retryable {
                            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                            body: err.to_string(),
                        };
                    }
                    Err(err) => return AttemptOutcome::Fatal(ModelError::Transport(err)),
                };

                let status = response.status();
                let text = match response.text().await {
                    Ok(text) => text,
                    Err(err) => return AttemptOutcome::Fatal(ModelError::Transport(err)),
                };

                if status.is_success() {
                    AttemptOutcome::Success(text)
                } else if retry_config.is_retryable_status(status) {
                    AttemptOutcome::Retryable { status, body: text }
                } else {
                    tracing::error!("OpenAI returned {}: {}", status, text);
                    AttemptOutcome::Fatal(ModelError::Status { status, body: text })
                }
            }
        },
        |attempts, status, _body| ModelError::RetriesExhausted { attempts, status },
    )
    .await?;

    let parsed: OpenAIResponse = serde_json::from_str(&text)
        .map_err(|e| ModelError::Decode(format!("{}\nRaw body: {}", e, text)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| from_wire_message(choice.message))
        .ok_or(ModelError::EmptyResponse)
}
