use std::sync::Arc;

use crate::clients::retry::RetryConfig;
use crate::config::Settings;
use crate::error::ConfigError;
use crate::handlers::chat::ChatHandler;
use crate::handlers::http;
use crate::service::agent::{Agent, AgentConfig};
use crate::service::calendar_service::{CalendarClient, GoogleCalendarService, UnconfiguredCalendar};
use crate::service::openai_service::OpenAIService;
use crate::service::session_store::SessionStore;
use crate::service::tools::ToolRegistry;

/// Calendar adapter for `settings`; configuration problems are deferred to
/// tool calls so the service still starts and can explain itself.
pub fn build_calendar(settings: &Settings) -> Arc<dyn CalendarClient> {
    match GoogleCalendarService::from_credentials(
        settings.service_account_json.as_deref(),
        &settings.calendar_id,
        RetryConfig::with_max_retries(settings.http_retries),
    ) {
        Ok(calendar) => Arc::new(calendar),
        Err(err) => {
            tracing::warn!("calendar unavailable: {}", err);
            Arc::new(UnconfiguredCalendar::new(err.to_string()))
        }
    }
}

pub fn build_handler(settings: &Settings) -> Result<ChatHandler, ConfigError> {
    let api_key = settings.require_openai_key()?;
    let model = OpenAIService::new(
        api_key.to_string(),
        settings.openai_model.clone(),
        settings.openai_base_url.clone(),
    )
    .with_retry_config(RetryConfig::with_max_retries(settings.http_retries));
    tracing::info!(model = model.model(), calendar = %settings.calendar_id, "building agent");

    let tools = Arc::new(ToolRegistry::new(
        build_calendar(settings),
        settings.calendar_timeout,
    ));
    let agent = Agent::new(
        Arc::new(model),
        tools,
        AgentConfig {
            max_iterations: settings.max_iterations,
            model_timeout: settings.llm_timeout,
        },
    );
    Ok(ChatHandler::new(
        Arc::new(SessionStore::new()),
        Arc::new(agent),
    ))
}

pub async fn run_api(settings: Settings) -> Result<(), ConfigError> {
    let handler = Arc::new(build_handler(&settings)?);
    tracing::info!("listening on {}", settings.bind_addr);
    warp::serve(http::routes(handler))
        .run(settings.bind_addr)
        .await;
    Ok(())
}
