//! Database row types. These map directly to SQLite rows and are decoded
//! into `finewatch_types` models before leaving the crate.
use chrono::{DateTime, Utc};
use finewatch_types::{FineRecord, NotificationAttempt};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::StoreError;

/// A validated fine ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFine {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub category: String,
    pub amount: Decimal,
    pub order_ref: Option<String>,
    pub status: String,
}

pub struct FineRow {
    pub id: String,
    pub occurred_at: String,
    pub category: String,
    pub amount: String,
    pub order_ref: Option<String>,
    pub status: String,
    pub recorded_at: String,
    pub notified: bool,
}

pub struct AttemptRow {
    pub record_id: String,
    pub channel: String,
    pub sent_at: String,
    pub success: bool,
}

impl TryFrom<FineRow> for FineRecord {
    type Error = StoreError;

    fn try_from(row: FineRow) -> Result<Self, Self::Error> {
        let occurred_at = parse_ts(&row.id, &row.occurred_at)?;
        let recorded_at = parse_ts(&row.id, &row.recorded_at)?;
        let amount = Decimal::from_str(&row.amount).map_err(|e| StoreError::CorruptRow {
            id: row.id.clone(),
            reason: format!("amount {:?}: {}", row.amount, e),
        })?;

        Ok(FineRecord {
            id: row.id,
            occurred_at,
            category: row.category,
            amount,
            order_ref: row.order_ref,
            status: row.status,
            notified: row.notified,
            recorded_at,
        })
    }
}

impl TryFrom<AttemptRow> for NotificationAttempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let sent_at = parse_ts(&row.record_id, &row.sent_at)?;
        Ok(NotificationAttempt {
            record_id: row.record_id,
            channel: row.channel,
            sent_at,
            success: row.success,
        })
    }
}

fn parse_ts(id: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            id: id.to_string(),
            reason: format!("timestamp {:?}: {}", value, e),
        })
}

/// Timestamps are stored as RFC 3339 text with fixed precision so that
/// lexical order in SQL matches chronological order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
