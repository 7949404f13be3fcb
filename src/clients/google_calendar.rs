//! Google Calendar v3 over plain reqwest, authenticated with a service
//! account (JWT bearer grant).

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clients::retry::{self, AttemptOutcome, RetryConfig};
use crate::error::CalendarError;
use crate::models::calendar::{BusySlot, CreatedEvent, NewEvent};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, CalendarError> {
        serde_json::from_str(raw).map_err(|e| {
            CalendarError::Config(format!(
                "failed to decode GOOGLE_SERVICE_ACCOUNT_JSON, check its format: {}",
                e
            ))
        })
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    start: Option<EventTime>,
    end: Option<EventTime>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

/// Insert body. `id` is chosen client-side so a retried POST cannot create
/// a second copy of the event.
#[derive(Debug, Serialize)]
struct EventInsert<'a> {
    id: &'a str,
    summary: &'a str,
    start: EventTime,
    end: EventTime,
}

impl<'a> EventInsert<'a> {
    fn new(id: &'a str, event: &'a NewEvent) -> Self {
        Self {
            id,
            summary: &event.title,
            start: EventTime::utc(event.start_time),
            end: EventTime::utc(event.end_time),
        }
    }
}

/// Event ids must be base32hex (0-9, a-v), 5 to 1024 characters.
fn new_event_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    html_link: Option<String>,
}

impl EventTime {
    fn utc(at: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(at),
            date: None,
            time_zone: Some("UTC".to_string()),
        }
    }

    /// Timed events use `dateTime`; all-day events only carry `date`.
    fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time.or_else(|| {
            self.date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
    }
}

#[derive(Debug, PartialEq)]
enum Reply {
    Body(String),
    AlreadyExists,
}

/// Maps one HTTP reply onto the retry loop. With `conflict_means_done`, a 409
/// on a retry means an earlier attempt already created the resource.
fn classify_reply(
    retry_config: &RetryConfig,
    attempt: u32,
    status: StatusCode,
    body: String,
    conflict_means_done: bool,
) -> AttemptOutcome<Reply, CalendarError> {
    if status.is_success() {
        AttemptOutcome::Success(Reply::Body(body))
    } else if conflict_means_done && attempt > 0 && status == StatusCode::CONFLICT {
        AttemptOutcome::Success(Reply::AlreadyExists)
    } else if retry_config.is_retryable_status(status) {
        AttemptOutcome::Retryable { status, body }
    } else {
        AttemptOutcome::Fatal(CalendarError::Status { status, body })
    }
}

/// Decodes an events list into busy intervals ordered by start. Cancelled
/// events and items without usable times are skipped.
fn busy_slots(body: &str) -> Result<Vec<BusySlot>, CalendarError> {
    let list: EventList =
        serde_json::from_str(body).map_err(|e| CalendarError::Decode(e.to_string()))?;
    let mut slots: Vec<BusySlot> = list
        .items
        .iter()
        .filter(|item| item.status.as_deref() != Some("cancelled"))
        .filter_map(|item| {
            let start = item.start.as_ref()?.instant()?;
            let end = item.end.as_ref()?.instant()?;
            Some(BusySlot::new(start, end))
        })
        .collect();
    slots.sort_by_key(|slot| slot.start);
    Ok(slots)
}

fn created_event(body: &str) -> Result<CreatedEvent, CalendarError> {
    let inserted: InsertedEvent =
        serde_json::from_str(body).map_err(|e| CalendarError::Decode(e.to_string()))?;
    Ok(CreatedEvent {
        id: inserted.id,
        html_link: inserted.html_link,
    })
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    api_base: String,
    retry_config: RetryConfig,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendarClient {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey, retry_config: RetryConfig) -> Self {
        Self {
            http,
            key,
            api_base: DEFAULT_API_BASE.to_string(),
            retry_config,
            token: Mutex::new(None),
        }
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, CalendarError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| CalendarError::Config(format!("invalid service account private key: {}", e)))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| CalendarError::Auth(e.to_string()))
    }

    /// Returns a cached bearer token, refreshing a minute before expiry.
    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(token.token.clone());
            }
        }

        let assertion = self.signed_assertion(Utc::now())?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CalendarError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| CalendarError::Decode(e.to_string()))?;

        tracing::debug!("refreshed calendar access token for {}", self.key.client_email);
        *cached = Some(CachedToken {
            token: parsed.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        });
        Ok(parsed.access_token)
    }

    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url, CalendarError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| CalendarError::Config(format!("invalid calendar API base: {}", e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CalendarError::Config("calendar API base cannot hold a path".to_string())
            })?;
            segments.extend(["calendars", calendar_id, "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }

    async fn send_with_retry(
        &self,
        build: impl Fn(&str) -> reqwest::RequestBuilder,
        conflict_means_done: bool,
    ) -> Result<Reply, CalendarError> {
        let token = self.access_token().await?;
        retry::with_retry(
            &self.retry_config,
            |attempt| {
                let request = build(&token);
                async move {
                    let response = match request.send().await {
                        Ok(response) => response,
                        Err(err) if retry::is_transient(&err) => {
                            return AttemptOutcome::Retryable {
                                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                                body: err.to_string(),
                            };
                        }
                        Err(err) => return AttemptOutcome::Fatal(CalendarError::Transport(err)),
                    };
                    let status = response.status();
                    let body = match response.text().await {
                        Ok(body) => body,
                        Err(err) => return AttemptOutcome::Fatal(CalendarError::Transport(err)),
                    };
                    classify_reply(&self.retry_config, attempt, status, body, conflict_means_done)
                }
            },
            |attempts, status, _body| CalendarError::RetriesExhausted { attempts, status },
        )
        .await
    }

    async fn fetch(
        &self,
        build: impl Fn(&str) -> reqwest::RequestBuilder,
    ) -> Result<String, CalendarError> {
        match self.send_with_retry(build, false).await? {
            Reply::Body(body) => Ok(body),
            Reply::AlreadyExists => Err(CalendarError::Status {
                status: StatusCode::CONFLICT,
                body: String::new(),
            }),
        }
    }

    /// Events overlapping `[time_min, time_max)`, ordered by start time.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusySlot>, CalendarError> {
        let url = self.events_url(calendar_id, None)?;
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let body = self
            .fetch(|token| {
                self.http
                    .get(url.clone())
                    .bearer_auth(token)
                    .query(&[
                        ("timeMin", time_min.as_str()),
                        ("timeMax", time_max.as_str()),
                        ("singleEvents", "true"),
                        ("orderBy", "startTime"),
                    ])
            })
            .await?;
        busy_slots(&body)
    }

    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<CreatedEvent, CalendarError> {
        let url = self.events_url(calendar_id, None)?;
        let event_id = new_event_id();
        let payload = EventInsert::new(&event_id, event);
        let reply = self
            .send_with_retry(
                |token| self.http.post(url.clone()).bearer_auth(token).json(&payload),
                true,
            )
            .await?;

        match reply {
            Reply::Body(body) => created_event(&body),
            Reply::AlreadyExists => {
                tracing::info!(event_id = %event_id, "event was created by an earlier attempt");
                let url = self.events_url(calendar_id, Some(&event_id))?;
                let body = self
                    .fetch(|token| self.http.get(url.clone()).bearer_auth(token))
                    .await?;
                created_event(&body)
            }
        }
    }
}
