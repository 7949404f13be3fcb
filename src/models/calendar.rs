use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One existing event's span inside a queried window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusySlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

impl CreatedEvent {
    /// Link when the service returned one, otherwise the event id.
    pub fn reference(&self) -> &str {
        self.html_link.as_deref().unwrap_or(&self.id)
    }
}
