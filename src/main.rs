#![allow(non_snake_case)]

use std::env;
use std::process::ExitCode;

use bookingBot::cli;
use bookingBot::config::{AppConfig, RunMode, Settings};
use bookingBot::runtime;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => match AppConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        Err(_) => AppConfig::default(),
    };

    let settings = match Settings::load(&config) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match settings.run_mode {
        RunMode::Api => {
            if let Err(e) = runtime::run_api(settings).await {
                tracing::error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
        RunMode::Cli => cli::cli(settings.backend_url).await,
    }
    ExitCode::SUCCESS
}
