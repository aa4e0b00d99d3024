use std::path::PathBuf;

use clap::Parser;
use discuss_config::LogLevel;

/// Follow a discuss channel over the real-time broker and log what arrives.
#[derive(Parser, Debug)]
#[command(name = "discuss-sync", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bearer token for the broker. Without one nothing connects.
    #[arg(long, env = "DISCUSS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Channel to open on start.
    #[arg(long)]
    pub channel: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,
}

pub fn parse() -> Args {
    Args::parse()
}

fn parse_log_level(raw: &str) -> Result<LogLevel, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => Err(format!("unknown log level: {other}")),
    }
}
