use uuid::Uuid;

use crate::clients::backend_client::ChatTransport;
use crate::models::chat::ChatRequest;
use crate::models::message::Role;

pub const GREETING: &str = "Hello! How can I help you book an appointment today?";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub role: Role,
    pub content: String,
}

/// Terminal-side conversation: keeps the session id and what has been shown.
pub struct ChatClient<T: ChatTransport> {
    transport: T,
    session_id: String,
    transcript: Vec<ChatLine>,
}

impl<T: ChatTransport> ChatClient<T> {
    pub fn new(transport: T, session_id: Option<String>) -> Self {
        Self {
            transport,
            session_id: session_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            transcript: vec![ChatLine {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    /// Forwards `prompt` and returns the text to show. Transport failures
    /// become an apology that is recorded like any other reply.
    pub async fn send(&mut self, prompt: &str) -> String {
        self.transcript.push(ChatLine {
            role: Role::User,
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            session_id: Some(self.session_id.clone()),
            message: prompt.to_string(),
        };
        let reply = match self.transport.send(&request).await {
            Ok(response) => {
                self.session_id = response.session_id;
                response.response
            }
            Err(err) => {
                tracing::warn!("backend request failed: {}", err);
                format!(
                    "Sorry, I'm having trouble connecting to my brain. Please try again later. Error: {}",
                    err
                )
            }
        };

        self.transcript.push(ChatLine {
            role: Role::Assistant,
            content: reply.clone(),
        });
        reply
    }
}
