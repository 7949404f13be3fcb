use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::clients::google_calendar::{GoogleCalendarClient, ServiceAccountKey};
use crate::clients::retry::RetryConfig;
use crate::error::CalendarError;
use crate::models::calendar::{BusySlot, CreatedEvent, NewEvent};

#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Busy intervals overlapping `[window_start, window_end)`, ordered by start.
    async fn list_busy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError>;

    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent, CalendarError>;
}

pub struct GoogleCalendarService {
    client: GoogleCalendarClient,
    calendar_id: String,
}

impl GoogleCalendarService {
    /// Fails when the credential blob is absent or cannot be decoded.
    pub fn from_credentials(
        credentials_json: Option<&str>,
        calendar_id: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, CalendarError> {
        let raw = credentials_json.ok_or_else(|| {
            CalendarError::Config(
                "The GOOGLE_SERVICE_ACCOUNT_JSON environment variable is not set.".to_string(),
            )
        })?;
        let key = ServiceAccountKey::from_json(raw)?;
        Ok(Self {
            client: GoogleCalendarClient::new(reqwest::Client::new(), key, retry_config),
            calendar_id: calendar_id.to_string(),
        })
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarService {
    async fn list_busy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError> {
        self.client
            .list_events(&self.calendar_id, window_start, window_end)
            .await
    }

    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent, CalendarError> {
        tracing::info!(
            calendar = %self.calendar_id,
            start = %event.start_time,
            end = %event.end_time,
            "creating calendar event"
        );
        self.client.insert_event(&self.calendar_id, &event).await
    }
}

/// Stand-in used when the calendar could not be configured at startup;
/// every call reports that problem.
pub struct UnconfiguredCalendar {
    reason: String,
}

impl UnconfiguredCalendar {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CalendarClient for UnconfiguredCalendar {
    async fn list_busy(
        &self,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError> {
        Err(CalendarError::Config(self.reason.clone()))
    }

    async fn create_event(&self, _event: NewEvent) -> Result<CreatedEvent, CalendarError> {
        Err(CalendarError::Config(self.reason.clone()))
    }
}
