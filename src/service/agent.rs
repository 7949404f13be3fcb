//! The turn loop: ask the model, run any requested tools, repeat until the
//! model answers without tool calls.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::AgentError;
use crate::models::message::{Conversation, Message, ToolDefinition};
use crate::service::openai_service::ChatModel;
use crate::service::tools::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingModel,
    ExecutingTools,
    Done,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model calls allowed per turn before the turn fails.
    pub max_iterations: usize,
    pub model_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model_timeout: Duration::from_secs(60),
        }
    }
}

pub fn system_prompt(now: DateTime<Utc>) -> String {
    format!(
        "You are a friendly scheduling assistant that books appointments on the user's calendar.\n\
         Current date and time (UTC): {now}\n\
         Rules:\n\
         - Working hours are 9 AM to 5 PM. Use check_availability before proposing times.\n\
         - All times are UTC. Pass ISO 8601 timestamps without an offset, e.g. 2024-07-18T10:00:00.\n\
         - When the user refers to a day mentioned earlier in the conversation, reuse that date.\n\
         - Confirm bookings with the event link returned by book_appointment.\n\
         - If a tool reports an error, explain it briefly and suggest what to try next.",
        now = now.to_rfc3339()
    )
}

pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    definitions: Vec<ToolDefinition>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        let definitions = tools.definitions();
        Self {
            model,
            tools,
            definitions,
            config,
        }
    }

    /// Appends `user_text` and drives the conversation to a final assistant
    /// message. Messages produced along the way stay in `conversation` even
    /// when the turn fails.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
    ) -> Result<Message, AgentError> {
        conversation.push(Message::user(user_text));
        let system = system_prompt(Utc::now());

        let mut state = AgentState::AwaitingModel;
        let mut iterations = 0;
        loop {
            state = match state {
                AgentState::AwaitingModel => {
                    if iterations >= self.config.max_iterations {
                        tracing::error!(
                            "turn exceeded {} model calls, aborting",
                            self.config.max_iterations
                        );
                        return Err(AgentError::IterationLimit(self.config.max_iterations));
                    }
                    iterations += 1;

                    let response = tokio::time::timeout(
                        self.config.model_timeout,
                        self.model.complete(
                            conversation.messages(),
                            Some(&system),
                            &self.definitions,
                        ),
                    )
                    .await
                    .map_err(|_| AgentError::ModelTimeout(self.config.model_timeout.as_secs()))??;

                    let next = if response.has_tool_calls() {
                        AgentState::ExecutingTools
                    } else {
                        AgentState::Done
                    };
                    conversation.push(response);
                    next
                }
                AgentState::ExecutingTools => {
                    let calls = conversation
                        .last()
                        .map(|message| message.tool_calls.clone())
                        .unwrap_or_default();
                    for call in &calls {
                        let result = self.tools.invoke(call).await;
                        conversation.push(Message::tool_result(&call.id, &result));
                    }
                    AgentState::AwaitingModel
                }
                AgentState::Done => {
                    let answer = conversation
                        .last()
                        .cloned()
                        .unwrap_or_else(|| Message::assistant("", Vec::new()));
                    tracing::info!(model_calls = iterations, "turn complete");
                    return Ok(answer);
                }
            };
        }
    }
}
