use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_RUN_MODE: &str = "cli";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::File(e.to_string()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::File(format!(
                    "Invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Config file first, then the process environment.
    pub fn prop(&self, key: &str) -> Option<String> {
        self.get(key)
            .or_else(|| env::var(key).ok())
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Api,
    Cli,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    pub bind_addr: SocketAddr,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub service_account_json: Option<String>,
    pub calendar_id: String,
    pub backend_url: String,
    pub max_iterations: usize,
    pub llm_timeout: Duration,
    pub calendar_timeout: Duration,
    pub http_retries: u32,
}

impl Settings {
    pub fn load(config: &AppConfig) -> Result<Self, ConfigError> {
        let run_mode = match config
            .prop("RUN_MODE")
            .unwrap_or(DEFAULT_RUN_MODE.to_string())
            .as_str()
        {
            "api" => RunMode::Api,
            "cli" => RunMode::Cli,
            other => {
                return Err(ConfigError::Invalid {
                    key: "RUN_MODE",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            run_mode,
            bind_addr: parse_or(config, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?,
            openai_api_key: config.prop("OPENAI_API_KEY"),
            openai_model: config
                .prop("OPENAI_MODEL")
                .unwrap_or(DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: config
                .prop("OPENAI_BASE_URL")
                .unwrap_or(DEFAULT_OPENAI_BASE_URL.to_string()),
            service_account_json: config.prop("GOOGLE_SERVICE_ACCOUNT_JSON"),
            calendar_id: config
                .prop("GOOGLE_CALENDAR_ID")
                .unwrap_or(DEFAULT_CALENDAR_ID.to_string()),
            backend_url: config
                .prop("BACKEND_URL")
                .unwrap_or(DEFAULT_BACKEND_URL.to_string()),
            max_iterations: parse_or(config, "AGENT_MAX_ITERATIONS", Some(10))?,
            llm_timeout: Duration::from_secs(parse_or(config, "LLM_TIMEOUT_SECS", Some(60))?),
            calendar_timeout: Duration::from_secs(parse_or(
                config,
                "CALENDAR_TIMEOUT_SECS",
                Some(20),
            )?),
            http_retries: parse_or(config, "HTTP_RETRIES", Some(2))?,
        })
    }

    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::MissingEnv {
                key: "OPENAI_API_KEY",
            })
    }
}

fn parse_or<T: FromStr>(
    config: &AppConfig,
    key: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match config.prop(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
        }),
        None => default.ok_or(ConfigError::MissingEnv { key }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_exports_and_quotes() {
        let config = AppConfig::parse(
            "# comment\n\nexport RUN_MODE=api\nGOOGLE_CALENDAR_ID=\"team@example.com\"\nBIND_ADDR='127.0.0.1:9000'\n",
        )
        .unwrap();
        assert_eq!(config.get("RUN_MODE").as_deref(), Some("api"));
        assert_eq!(config.get("GOOGLE_CALENDAR_ID").as_deref(), Some("team@example.com"));
        assert_eq!(config.get("BIND_ADDR").as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn rejects_lines_without_equals() {
        let err = AppConfig::parse("RUN_MODE=api\nnot a pair\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn settings_from_file_values() {
        let config = AppConfig::parse(
            "RUN_MODE=api\nBIND_ADDR=127.0.0.1:9000\nAGENT_MAX_ITERATIONS=4\nLLM_TIMEOUT_SECS=5\nOPENAI_MODEL=gpt-test\n",
        )
        .unwrap();
        let settings = Settings::load(&config).unwrap();
        assert_eq!(settings.run_mode, RunMode::Api);
        assert_eq!(settings.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(settings.max_iterations, 4);
        assert_eq!(settings.llm_timeout, Duration::from_secs(5));
        assert_eq!(settings.openai_model, "gpt-test");
    }

    #[test]
    fn settings_reject_bad_numbers() {
        let config = AppConfig::parse("AGENT_MAX_ITERATIONS=lots\n").unwrap();
        let err = Settings::load(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "AGENT_MAX_ITERATIONS",
                ..
            }
        ));
    }

    #[test]
    fn settings_reject_unknown_run_mode() {
        let config = AppConfig::parse("RUN_MODE=batch\n").unwrap();
        assert!(matches!(
            Settings::load(&config),
            Err(ConfigError::Invalid { key: "RUN_MODE", .. })
        ));
    }
}
