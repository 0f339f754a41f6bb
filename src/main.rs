mod arbitrage;
mod bot;
mod commands;
mod config;
mod domain;
mod exchanges;
mod notification;
mod server;
mod storage;

use bot::Bot;
use config::Config;
use std::env;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
        if arg == "--config" || arg == "-c" {
            if let Some(path) = args.next() {
                return path;
            }
        }
    }
    env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    let config_path = parse_config_path();

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let bot = match Bot::new(config, env!("CARGO_PKG_VERSION")).await {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %e, "Failed to create bot");
            std::process::exit(1);
        }
    };

    info!(config = %config_path, "Bot initialized");

    if let Err(e) = bot.start().await {
        error!(error = %e, "Bot error");
    }

    if let Err(e) = bot.stop().await {
        error!(error = %e, "Failed to stop bot");
    }
}
