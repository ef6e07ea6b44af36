use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use env_logger::Builder;
use log::{info, LevelFilter};

use crate::services::notification::MessageStyle;
use crate::services::poster::WebhookConfig;
use crate::services::verification::VerificationPolicy;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Starting channel mean bot...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Mode::Production),
            "development" | "dev" | "non-production" => Ok(Mode::Development),
            other => Err(anyhow::anyhow!("Unknown BOT_MODE {other:?}")),
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub mode: Mode,
    pub youtube_api_key: String,
    pub channel_id: String,
    pub history_path: PathBuf,
    pub chart_path: PathBuf,
    pub chart_title: String,
    /// Cron expression (with seconds) that triggers polling cycles.
    pub check_schedule: String,
    pub verification: VerificationPolicy,
    pub message: MessageStyle,
    /// `None` means posts only go to the log.
    pub webhook: Option<WebhookConfig>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value lookup. Mode picks the
    /// defaults, every other variable overrides one of them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mode = match get("BOT_MODE") {
            Some(value) => Mode::parse(&value)?,
            None => Mode::Development,
        };
        let production = mode.is_production();

        let youtube_api_key =
            get("YOUTUBE_API_KEY").context("YOUTUBE_API_KEY environment variable must be set")?;
        let channel_id = get("CHANNEL_ID").context("CHANNEL_ID environment variable must be set")?;

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "data".to_string()));

        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a number of seconds")),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let required_attempts = match get("REQUIRED_VERIFICATIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .context("REQUIRED_VERIFICATIONS must be a non-negative integer")?,
            None if production => 2,
            None => 0,
        };

        let verification = VerificationPolicy {
            required_attempts,
            backoff_min: seconds("BACKOFF_MIN_SECS", if production { HOUR } else { 0 })?,
            backoff_max: seconds("BACKOFF_MAX_SECS", if production { 3 * HOUR } else { 0 })?,
            error_backoff_min: seconds(
                "ERROR_BACKOFF_MIN_SECS",
                if production { 8 * MINUTE } else { 0 },
            )?,
            error_backoff_max: seconds(
                "ERROR_BACKOFF_MAX_SECS",
                if production { 12 * MINUTE } else { 0 },
            )?,
            precheck_latest: match get("PRECHECK_LATEST") {
                Some(value) => parse_bool(&value).context("PRECHECK_LATEST must be true or false")?,
                None => true,
            },
        };

        let check_schedule = get("CHECK_SCHEDULE").unwrap_or_else(|| {
            if production {
                "0 0 * * * *".to_string()
            } else {
                "0 * * * * *".to_string()
            }
        });

        let webhook = match (production, get("POST_WEBHOOK_URL")) {
            (true, Some(url)) => Some(WebhookConfig {
                url,
                token: get("POST_WEBHOOK_TOKEN"),
                timeout: seconds("POST_TIMEOUT_SECS", 30)?,
            }),
            _ => None,
        };

        let stat_label = get("STAT_LABEL").unwrap_or_else(|| MessageStyle::default().stat_label);

        Ok(BotConfig {
            mode,
            youtube_api_key,
            channel_id,
            history_path: data_dir.join("channel_data.csv"),
            chart_path: data_dir.join("mean_plot.png"),
            chart_title: get("CHART_TITLE")
                .unwrap_or_else(|| "Mean video duration over time".to_string()),
            check_schedule,
            verification,
            message: MessageStyle {
                header: get("MESSAGE_HEADER"),
                stat_label,
            },
            webhook,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("not a boolean: {other:?}")),
    }
}
