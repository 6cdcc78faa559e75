//! Process-level configuration shared by the binaries

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "stockcast".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build from `STOCKCAST_ENV` and `STOCKCAST_LOG_FORMAT`, keeping defaults
    /// for anything unset or unparseable
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(env) = lookup("STOCKCAST_ENV") {
            config.environment = env;
        }
        if let Some(format) = lookup("STOCKCAST_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            config.log_format = format;
        }
        config
    }
}
