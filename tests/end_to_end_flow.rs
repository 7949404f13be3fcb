mod common;

use std::sync::Arc;

use bookingBot::handlers::chat::ChatHandler;
use bookingBot::models::chat::ChatRequest;
use bookingBot::service::session_store::SessionStore;
use chrono::SecondsFormat;
use common::{InMemoryCalendar, ScriptedModel, Step, agent, tool_call};
use serde_json::json;

#[tokio::test]
async fn check_then_book_across_two_requests() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_call("call_1", "check_availability", json!({ "date": "2024-07-18" })),
        Step::EchoToolResult(""),
        tool_call(
            "call_2",
            "book_appointment",
            json!({
                "start_time": "2024-07-18T10:00:00",
                "end_time": "2024-07-18T11:00:00",
                "summary": "demo"
            }),
        ),
        Step::EchoToolResult("Done. "),
    ]));
    let calendar = Arc::new(InMemoryCalendar::default());
    let handler = ChatHandler::new(
        Arc::new(SessionStore::new()),
        Arc::new(agent(model.clone(), calendar.clone())),
    );

    let first = handler
        .handle_chat(ChatRequest {
            session_id: None,
            message: "Do I have any free time on 2024-07-18?".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        first.response,
        "The entire day from 9 AM to 5 PM is free on 2024-07-18."
    );

    let second = handler
        .handle_chat(ChatRequest {
            session_id: Some(first.session_id.clone()),
            message: "Book 10am-11am for a demo".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);
    assert_eq!(
        second.response,
        "Done. Appointment booked successfully! View event: https://calendar.example.com/event?eid=evt-1"
    );

    let inserted = calendar.inserted();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].title, "demo");
    assert_eq!(inserted[0].start_time.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-07-18T10:00:00Z");
    assert_eq!(inserted[0].end_time.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-07-18T11:00:00Z");

    // The booking request was made with the first turn's history in view.
    let seen = model.seen.lock().unwrap();
    let third_call = &seen[2];
    assert_eq!(third_call[0].content, "Do I have any free time on 2024-07-18?");
    assert_eq!(third_call[4].content, "Book 10am-11am for a demo");
    assert_eq!(third_call.len(), 5);
    assert_eq!(handler.sessions().len().await, 1);
}
