mod common;

use std::sync::Arc;
use std::time::Duration;

use bookingBot::models::message::ToolCallRequest;
use bookingBot::service::tools::ToolRegistry;
use chrono::{TimeZone, Utc};
use common::{InMemoryCalendar, registry};
use serde_json::json;

fn check(date: &str) -> ToolCallRequest {
    ToolCallRequest::new("check", "check_availability", json!({ "date": date }))
}

fn book(start: &str, end: &str, summary: &str) -> ToolCallRequest {
    ToolCallRequest::new(
        "book",
        "book_appointment",
        json!({ "start_time": start, "end_time": end, "summary": summary }),
    )
}

#[tokio::test]
async fn empty_day_is_entirely_free() {
    let tools = registry(Arc::new(InMemoryCalendar::default()));
    assert_eq!(
        tools.invoke(&check("2024-07-18")).await,
        "The entire day from 9 AM to 5 PM is free on 2024-07-18."
    );
}

#[tokio::test]
async fn fully_booked_day_says_so() {
    let calendar = InMemoryCalendar::with_busy(&[(
        Utc.with_ymd_and_hms(2024, 7, 18, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 7, 18, 17, 0, 0).unwrap(),
    )]);
    let tools = registry(Arc::new(calendar));
    assert_eq!(
        tools.invoke(&check("2024-07-18")).await,
        "No availability on 2024-07-18 between 9 AM and 5 PM."
    );
}

#[tokio::test]
async fn checking_twice_gives_the_same_answer() {
    let calendar = InMemoryCalendar::with_busy(&[(
        Utc.with_ymd_and_hms(2024, 7, 18, 12, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 7, 18, 13, 0, 0).unwrap(),
    )]);
    let tools = registry(Arc::new(calendar));
    let first = tools.invoke(&check("2024-07-18")).await;
    let second = tools.invoke(&check("2024-07-18")).await;
    assert_eq!(first, second);
    assert_eq!(
        first,
        "Available slots on 2024-07-18: 09:00 AM to 12:00 PM, 01:00 PM to 05:00 PM."
    );
}

#[tokio::test]
async fn booked_interval_disappears_from_availability() {
    let calendar = Arc::new(InMemoryCalendar::default());
    let tools = registry(calendar.clone());

    let confirmation = tools
        .invoke(&book("2024-07-18T10:00:00", "2024-07-18T11:00:00", "demo"))
        .await;
    assert_eq!(
        confirmation,
        "Appointment booked successfully! View event: https://calendar.example.com/event?eid=evt-1"
    );

    let availability = tools.invoke(&check("2024-07-18")).await;
    assert_eq!(
        availability,
        "Available slots on 2024-07-18: 09:00 AM to 10:00 AM, 11:00 AM to 05:00 PM."
    );

    let inserted = calendar.inserted();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].title, "demo");
    assert_eq!(inserted[0].start_time, Utc.with_ymd_and_hms(2024, 7, 18, 10, 0, 0).unwrap());
}

#[tokio::test]
async fn booking_with_offset_is_stored_in_utc() {
    let calendar = Arc::new(InMemoryCalendar::default());
    let tools = registry(calendar.clone());
    tools
        .invoke(&book("2024-07-18T12:00:00+02:00", "2024-07-18T13:00:00+02:00", "lunch"))
        .await;
    assert_eq!(
        calendar.inserted()[0].start_time,
        Utc.with_ymd_and_hms(2024, 7, 18, 10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn malformed_input_never_reaches_the_calendar() {
    let calendar = Arc::new(InMemoryCalendar::default());
    let tools = registry(calendar.clone());

    let bad_date = tools.invoke(&check("next tuesday")).await;
    assert!(bad_date.starts_with("An error occurred while checking availability: invalid input"));

    let bad_time = tools.invoke(&book("ten o'clock", "2024-07-18T11:00:00", "demo")).await;
    assert!(bad_time.starts_with("An error occurred while booking the appointment: invalid input"));

    let backwards = tools
        .invoke(&book("2024-07-18T11:00:00", "2024-07-18T10:00:00", "demo"))
        .await;
    assert!(backwards.contains("must be after start time"));

    let missing = tools
        .invoke(&ToolCallRequest::new("x", "book_appointment", json!({"summary": "demo"})))
        .await;
    assert!(missing.contains("missing 'start_time' argument"));

    assert_eq!(*calendar.list_calls.lock().unwrap(), 0);
    assert!(calendar.inserted().is_empty());
}

#[tokio::test]
async fn calendar_errors_become_text() {
    let tools = registry(Arc::new(InMemoryCalendar::failing("quota exceeded")));
    let result = tools
        .invoke(&book("2024-07-18T10:00:00", "2024-07-18T11:00:00", "demo"))
        .await;
    assert_eq!(
        result,
        "An error occurred while booking the appointment: failed to decode calendar response: quota exceeded"
    );
}

#[tokio::test]
async fn slow_calendar_times_out_as_text() {
    let calendar = InMemoryCalendar {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let tools = ToolRegistry::new(Arc::new(calendar), Duration::from_millis(50));
    let result = tools.invoke(&check("2024-07-18")).await;
    assert!(result.starts_with("An error occurred while checking availability: calendar request timed out"));
}
