//! Telegram Bot API notifier.
//!
//! Messages are sent as plain text (no parse mode), so the only formatting
//! concern is stripping characters that some clients still render as
//! markup.

use std::time::Duration;

use async_trait::async_trait;
use finewatch_monitor::{Notifier, NotifyError};
use finewatch_types::FineRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const CHANNEL: &str = "telegram";

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout: Duration,
    /// Fines at or above this amount are flagged in the alert.
    pub high_fine_threshold: Decimal,
    /// Shown in the status summary, e.g. `MOCK` or `PROD`.
    pub mode_label: String,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    send_url: String,
    chat_id: String,
    high_fine_threshold: Decimal,
    mode_label: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let send_url = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self {
            client,
            send_url,
            chat_id: config.chat_id,
            high_fine_threshold: config.high_fine_threshold,
            mode_label: config.mode_label,
        })
    }

    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.send_url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            // never log the URL: it carries the bot token
            .map_err(|e| NotifyError::Http(e.without_url().to_string()))?;

        let status = resp.status();
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::Http(format!("unreadable response ({}): {}", status, e.without_url())))?;

        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| status.to_string()),
            ))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &str {
        CHANNEL
    }

    async fn send_record_alert(&self, record: &FineRecord) -> Result<(), NotifyError> {
        let text = format_alert(record, self.high_fine_threshold);

        match self.send_message(&text).await {
            Ok(()) => {
                info!(id = %record.id, "Alert sent");
                Ok(())
            }
            Err(NotifyError::Rejected(reason)) => {
                warn!(id = %record.id, reason = %reason, "Alert rejected, retrying as plain summary");
                self.send_message(&format_fallback(record)).await.inspect_err(|e| {
                    error!(id = %record.id, error = %e, "Fallback alert failed");
                })?;
                info!(id = %record.id, "Alert sent (fallback)");
                Ok(())
            }
            Err(e) => {
                error!(id = %record.id, error = %e, "Failed to send alert");
                Err(e)
            }
        }
    }

    async fn send_status_summary(&self, new_count: usize, total_count: u64) -> Result<(), NotifyError> {
        let text = format_summary(new_count, total_count, &self.mode_label);
        self.send_message(&text).await
    }
}

pub fn format_alert(record: &FineRecord, high_fine_threshold: Decimal) -> String {
    let header = if record.amount >= high_fine_threshold {
        "New marketplace fine (HIGH AMOUNT)"
    } else {
        "New marketplace fine"
    };

    format!(
        "{header}\n\
         \n\
         Violation: {category}\n\
         Amount: {amount}\n\
         Date: {date}\n\
         Order: {order}\n\
         Status: {status}\n\
         Fine ID: {id}\n\
         \n\
         Monitoring active",
        category = strip_markup(&record.category),
        amount = record.amount,
        date = record.occurred_at.format("%Y-%m-%d"),
        order = record.order_ref.as_deref().unwrap_or("not specified"),
        status = record.status,
        id = record.id,
    )
}

pub fn format_fallback(record: &FineRecord) -> String {
    format!(
        "NEW FINE\nType: {}\nAmount: {}\nID: {}",
        strip_markup(&record.category),
        record.amount,
        record.id
    )
}

pub fn format_summary(new_count: usize, total_count: u64, mode_label: &str) -> String {
    format!(
        "Fine monitoring status\n\n\
         New fines: {new_count}\n\
         Total stored: {total_count}\n\
         Mode: {mode_label}\n\
         Bot active"
    )
}

fn strip_markup(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '[' | ']'))
        .collect()
}
