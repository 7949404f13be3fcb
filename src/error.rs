use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {key}")]
    MissingEnv { key: &'static str },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to read config file: {0}")]
    File(String),
}

/// Failures talking to the language-model service.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("model transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode model response: {0}")]
    Decode(String),

    #[error("no response from model")]
    EmptyResponse,

    #[error("model request gave up after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: StatusCode },
}

/// Failures of the calendar adapter. These never escape a tool call; the
/// registry renders them into the tool result text.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar is not configured: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("calendar authentication failed: {0}")]
    Auth(String),

    #[error("calendar request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("calendar transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode calendar response: {0}")]
    Decode(String),

    #[error("calendar request timed out after {0}s")]
    Timeout(u64),

    #[error("calendar request gave up after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: StatusCode },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model did not answer within {0}s")]
    ModelTimeout(u64),

    #[error("agent exceeded {0} model/tool cycles without a final answer")]
    IterationLimit(usize),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("upstream failure: {0}")]
    Upstream(#[from] AgentError),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ChatError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
}
