use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::chat::{ChatRequest, ChatResponse};

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// Posts chat requests to the backend's `/chat` endpoint.
pub struct HttpChatTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(backend_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat", backend_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        Ok(response.json::<ChatResponse>().await?)
    }
}
