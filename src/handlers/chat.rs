use std::sync::Arc;

use crate::error::ChatError;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::service::agent::Agent;
use crate::service::session_store::SessionStore;

pub struct ChatHandler {
    sessions: Arc<SessionStore>,
    agent: Arc<Agent>,
}

impl ChatHandler {
    pub fn new(sessions: Arc<SessionStore>, agent: Arc<Agent>) -> Self {
        Self { sessions, agent }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Runs one turn for the request's session. The session stays locked for
    /// the whole turn, so concurrent requests on one id are served in order.
    pub async fn handle_chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let text = request.message.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidInput("message must not be empty".to_string()));
        }

        let (session_id, session) = self
            .sessions
            .get_or_create(request.session_id.as_deref())
            .await;
        tracing::info!(session_id = %session_id, "chat request");

        let mut session = session.lock().await;
        let outcome = self.agent.run_turn(&mut session.conversation, text).await;

        match outcome {
            Ok(answer) => {
                session.record_turn();
                Ok(ChatResponse {
                    response: answer.content,
                    session_id,
                })
            }
            Err(err) => {
                tracing::error!(session_id = %session_id, "turn failed: {}", err);
                Err(ChatError::Upstream(err))
            }
        }
    }
}
