use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use finewatch_monitor::PollConfig;
use finewatch_telegram::TelegramConfig;
use finewatch_wb::ApiMode;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

/// Sample `.env` values that must be replaced before the bot can run.
const PLACEHOLDERS: &[&str] = &["your-bot-token", "your-chat-id", "change-me"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),
}

/// Everything the bot needs, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ApiMode,
    pub api_url: String,
    pub api_key: Option<String>,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,
    pub db_path: PathBuf,
    pub check_interval: Duration,
    pub fetch_timeout: Duration,
    pub lookback: Duration,
    pub high_fine_threshold: Decimal,
    pub redrive_backlog: bool,
    pub backlog_min_age: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Every problem is collected so the operator
    /// sees them all at once.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mode = match var("APP_MODE") {
            None => ApiMode::Mock,
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                errors.push(format!("APP_MODE: {}", e));
                ApiMode::Mock
            }),
        };

        let api_key = var("WB_API_KEY");
        if mode == ApiMode::Prod && api_key.is_none() {
            errors.push("WB_API_KEY is required in PROD mode".to_string());
        }

        let telegram_bot_token = required(&var, "TELEGRAM_BOT_TOKEN", &mut errors);
        let telegram_chat_id = required(&var, "TELEGRAM_CHAT_ID", &mut errors);

        let check_interval = secs(&var, "CHECK_INTERVAL", 30, &mut errors);
        let fetch_timeout = secs(&var, "FETCH_TIMEOUT", 30, &mut errors);
        let lookback_days: u64 = parsed(&var, "LOOKBACK_DAYS", 1, &mut errors);
        let high_fine_threshold = parsed(&var, "HIGH_FINE_THRESHOLD", Decimal::from(5000), &mut errors);
        let redrive_backlog = parsed(&var, "REDRIVE_BACKLOG", false, &mut errors);
        let backlog_min_age = secs(&var, "BACKLOG_MIN_AGE", 300, &mut errors);

        if check_interval.is_zero() {
            errors.push("CHECK_INTERVAL must be at least 1 second".to_string());
        }
        if lookback_days == 0 {
            errors.push("LOOKBACK_DAYS must be at least 1".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Ok(Self {
            mode,
            api_url: var("WB_API_URL").unwrap_or_else(|| mode.default_base_url().to_string()),
            api_key,
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_url: var("TELEGRAM_API_URL")
                .unwrap_or_else(|| finewatch_telegram::DEFAULT_API_BASE.to_string()),
            db_path: var("FINEWATCH_DB_PATH").unwrap_or_else(|| "finewatch.db".into()).into(),
            check_interval,
            fetch_timeout,
            lookback: Duration::from_secs(lookback_days * 24 * 3600),
            high_fine_threshold,
            redrive_backlog,
            backlog_min_age,
        })
    }

    pub fn poll(&self) -> PollConfig {
        PollConfig {
            interval: self.check_interval,
            fetch_timeout: self.fetch_timeout,
            lookback: self.lookback,
            redrive_backlog: self.redrive_backlog,
            backlog_min_age: self.backlog_min_age,
        }
    }

    pub fn telegram(&self) -> TelegramConfig {
        TelegramConfig {
            bot_token: self.telegram_bot_token.clone(),
            chat_id: self.telegram_chat_id.clone(),
            api_base: self.telegram_api_url.clone(),
            timeout: self.fetch_timeout,
            high_fine_threshold: self.high_fine_threshold,
            mode_label: self.mode.as_str().to_string(),
        }
    }

    /// Log the effective settings. Secrets are reported only as set/unset.
    pub fn log_summary(&self) {
        info!(
            mode = self.mode.as_str(),
            api_url = %self.api_url,
            api_key = if self.api_key.is_some() { "set" } else { "unset" },
            database = %self.db_path.display(),
            telegram_chat = %self.telegram_chat_id,
            interval_secs = self.check_interval.as_secs(),
            high_fine_threshold = %self.high_fine_threshold,
            redrive_backlog = self.redrive_backlog,
            "Configuration loaded"
        );
    }
}

fn required(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    errors: &mut Vec<String>,
) -> String {
    match var(key) {
        Some(v) if !PLACEHOLDERS.contains(&v.as_str()) => v,
        Some(_) => {
            errors.push(format!("{} is still a placeholder", key));
            String::new()
        }
        None => {
            errors.push(format!("{} is not set", key));
            String::new()
        }
    }
}

fn parsed<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    errors: &mut Vec<String>,
) -> T {
    match var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(format!("{}: cannot parse {:?}", key, raw));
            default
        }),
    }
}

fn secs(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
    errors: &mut Vec<String>,
) -> Duration {
    Duration::from_secs(parsed(var, key, default, errors))
}
