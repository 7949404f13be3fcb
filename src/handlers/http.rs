use std::convert::Infallible;
use std::sync::Arc;

use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::handlers::chat::ChatHandler;
use crate::models::chat::{ChatRequest, ErrorMessage};

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn routes(
    handler: Arc<ChatHandler>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::json(&json!({"message": "Welcome to the booking assistant API"})));

    let chat = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_handler(handler))
        .and_then(chat_reply);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    root.or(chat).with(cors).recover(handle_rejection)
}

fn with_handler(
    handler: Arc<ChatHandler>,
) -> impl Filter<Extract = (Arc<ChatHandler>,), Error = Infallible> + Clone {
    warp::any().map(move || handler.clone())
}

async fn chat_reply(
    request: ChatRequest,
    handler: Arc<ChatHandler>,
) -> Result<warp::reply::Response, Rejection> {
    let reply = match handler.handle_chat(request).await {
        Ok(response) => warp::reply::with_status(warp::reply::json(&response), StatusCode::OK),
        Err(err) => {
            warp::reply::with_status(
                warp::reply::json(&ErrorMessage {
                    error: err.to_string(),
                }),
                err.status(),
            )
        }
    };
    Ok(reply.into_response())
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected a JSON body".to_string())
    } else {
        tracing::error!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorMessage { error: message }),
        status,
    ))
}
