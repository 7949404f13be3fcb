#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use bookingBot::error::{CalendarError, ModelError};
use bookingBot::models::calendar::{BusySlot, CreatedEvent, NewEvent};
use bookingBot::models::message::{Message, Role, ToolCallRequest, ToolDefinition};
use bookingBot::service::agent::{Agent, AgentConfig};
use bookingBot::service::calendar_service::CalendarClient;
use bookingBot::service::openai_service::ChatModel;
use bookingBot::service::tools::ToolRegistry;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub enum Step {
    Reply(Message),
    /// Answer with `prefix` followed by the most recent tool result.
    EchoToolResult(&'static str),
    Fail(String),
}

pub fn tool_call(id: &str, name: &str, args: Value) -> Step {
    Step::Reply(Message::assistant("", vec![ToolCallRequest::new(id, name, args)]))
}

pub fn reply(text: &str) -> Step {
    Step::Reply(Message::assistant(text, Vec::new()))
}

/// Replays canned assistant messages and records what it was shown.
#[derive(Default)]
pub struct ScriptedModel {
    steps: StdMutex<VecDeque<Step>>,
    pub seen: StdMutex<Vec<Vec<Message>>>,
    pub tools_offered: StdMutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: StdMutex::new(steps.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[Message],
        _system: Option<&str>,
        tools: &[ToolDefinition],
    ) -> Result<Message, ModelError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        *self.tools_offered.lock().unwrap() = tools.iter().map(|t| t.name.clone()).collect();

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(message)) => Ok(message),
            Some(Step::EchoToolResult(prefix)) => {
                let last_tool = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Tool)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(Message::assistant(&format!("{}{}", prefix, last_tool), Vec::new()))
            }
            Some(Step::Fail(reason)) => Err(ModelError::Decode(reason)),
            None => Ok(Message::assistant("done", Vec::new())),
        }
    }
}

/// Calendar kept in memory; inserts become busy time.
#[derive(Default)]
pub struct InMemoryCalendar {
    pub events: StdMutex<Vec<NewEvent>>,
    pub list_calls: StdMutex<usize>,
    pub fail_with: Option<String>,
    pub delay: Option<Duration>,
}

impl InMemoryCalendar {
    pub fn with_busy(slots: &[(DateTime<Utc>, DateTime<Utc>)]) -> Self {
        let events = slots
            .iter()
            .map(|(start, end)| NewEvent {
                title: "busy".to_string(),
                start_time: *start,
                end_time: *end,
            })
            .collect();
        Self {
            events: StdMutex::new(events),
            ..Default::default()
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn inserted(&self) -> Vec<NewEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CalendarClient for InMemoryCalendar {
    async fn list_busy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        *self.list_calls.lock().unwrap() += 1;
        if let Some(reason) = &self.fail_with {
            return Err(CalendarError::Decode(reason.clone()));
        }
        let mut busy: Vec<BusySlot> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.start_time < window_end && e.end_time > window_start)
            .map(|e| BusySlot::new(e.start_time, e.end_time))
            .collect();
        busy.sort_by_key(|slot| slot.start);
        Ok(busy)
    }

    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent, CalendarError> {
        if let Some(reason) = &self.fail_with {
            return Err(CalendarError::Decode(reason.clone()));
        }
        let mut events = self.events.lock().unwrap();
        events.push(event);
        let id = format!("evt-{}", events.len());
        Ok(CreatedEvent {
            html_link: Some(format!("https://calendar.example.com/event?eid={}", id)),
            id,
        })
    }
}

pub fn registry(calendar: Arc<InMemoryCalendar>) -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new(calendar, Duration::from_secs(5)))
}

pub fn agent(model: Arc<ScriptedModel>, calendar: Arc<InMemoryCalendar>) -> Agent {
    Agent::new(model, registry(calendar), AgentConfig::default())
}
