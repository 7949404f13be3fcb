use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::json;

use crate::error::CalendarError;
use crate::models::calendar::NewEvent;
use crate::models::message::{ToolCallRequest, ToolDefinition};
use crate::service::availability::{render_availability, working_window};
use crate::service::calendar_service::CalendarClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CheckAvailability,
    BookAppointment,
}

impl ToolName {
    pub const ALL: [ToolName; 2] = [ToolName::CheckAvailability, ToolName::BookAppointment];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CheckAvailability => "check_availability",
            ToolName::BookAppointment => "book_appointment",
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolName::CheckAvailability => ToolDefinition {
                name: self.as_str().to_string(),
                description: "Checks for available appointment slots on a given date, assuming 9 AM to 5 PM working hours. Returns a summary of the free time slots.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "date": {
                            "type": "string",
                            "description": "The date to check, in 'YYYY-MM-DD' format."
                        }
                    },
                    "required": ["date"]
                }),
            },
            ToolName::BookAppointment => ToolDefinition {
                name: self.as_str().to_string(),
                description: "Books an appointment on the calendar. Returns a confirmation with a link to the event, or an error message.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "start_time": {
                            "type": "string",
                            "description": "Start of the appointment in ISO 8601 format, e.g. '2024-07-18T10:00:00'. Treated as UTC when no offset is given."
                        },
                        "end_time": {
                            "type": "string",
                            "description": "End of the appointment in ISO 8601 format, e.g. '2024-07-18T11:00:00'. Treated as UTC when no offset is given."
                        },
                        "summary": {
                            "type": "string",
                            "description": "A brief title for the appointment."
                        }
                    },
                    "required": ["start_time", "end_time", "summary"]
                }),
            },
        }
    }
}

/// Parses an ISO-8601 instant; timestamps without an offset are taken as UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, CalendarError> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(CalendarError::InvalidInput(format!(
        "'{}' is not an ISO 8601 date-time",
        raw
    )))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        CalendarError::InvalidInput(format!("'{}' is not a date in YYYY-MM-DD format", raw))
    })
}

fn required_arg<'a>(call: &'a ToolCallRequest, key: &str) -> Result<&'a str, CalendarError> {
    call.str_arg(key)
        .ok_or_else(|| CalendarError::InvalidInput(format!("missing '{}' argument", key)))
}

/// Exposes the calendar operations as model-callable tools. Every outcome,
/// including failure, comes back as plain text.
pub struct ToolRegistry {
    calendar: Arc<dyn CalendarClient>,
    table: HashMap<&'static str, ToolName>,
    call_timeout: Duration,
}

impl ToolRegistry {
    pub fn new(calendar: Arc<dyn CalendarClient>, call_timeout: Duration) -> Self {
        let table = ToolName::ALL
            .iter()
            .map(|tool| (tool.as_str(), *tool))
            .collect();
        Self {
            calendar,
            table,
            call_timeout,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ToolName> {
        self.table.get(name).copied()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL.iter().map(ToolName::definition).collect()
    }

    pub async fn invoke(&self, call: &ToolCallRequest) -> String {
        let Some(tool) = self.lookup(&call.name) else {
            tracing::warn!("model requested unknown tool '{}'", call.name);
            return format!("Error: unknown tool '{}'.", call.name);
        };

        tracing::debug!(tool = tool.as_str(), call_id = %call.id, "invoking tool");
        let outcome = tokio::time::timeout(self.call_timeout, self.dispatch(tool, call)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(CalendarError::Timeout(self.call_timeout.as_secs())),
        };

        match result {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(tool = tool.as_str(), "tool call failed: {}", err);
                match tool {
                    ToolName::CheckAvailability => {
                        format!("An error occurred while checking availability: {}", err)
                    }
                    ToolName::BookAppointment => {
                        format!("An error occurred while booking the appointment: {}", err)
                    }
                }
            }
        }
    }

    async fn dispatch(&self, tool: ToolName, call: &ToolCallRequest) -> Result<String, CalendarError> {
        match tool {
            ToolName::CheckAvailability => {
                let date = parse_date(required_arg(call, "date")?)?;
                self.check_availability(date).await
            }
            ToolName::BookAppointment => {
                let start = parse_instant(required_arg(call, "start_time")?)?;
                let end = parse_instant(required_arg(call, "end_time")?)?;
                let summary = required_arg(call, "summary")?;
                self.book_appointment(start, end, summary).await
            }
        }
    }

    pub async fn check_availability(&self, date: NaiveDate) -> Result<String, CalendarError> {
        let (window_start, window_end) = working_window(date);
        let busy = self.calendar.list_busy(window_start, window_end).await?;
        Ok(render_availability(date, &busy))
    }

    pub async fn book_appointment(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        summary: &str,
    ) -> Result<String, CalendarError> {
        if end <= start {
            return Err(CalendarError::InvalidInput(format!(
                "end time {} must be after start time {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        let created = self
            .calendar
            .create_event(NewEvent {
                title: summary.to_string(),
                start_time: start,
                end_time: end,
            })
            .await?;
        Ok(format!(
            "Appointment booked successfully! View event: {}",
            created.reference()
        ))
    }
}
