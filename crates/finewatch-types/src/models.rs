use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A penalty event as persisted by the monitor.
///
/// `id` is the upstream natural key. `category`, `amount` and `status` are
/// refreshed on every sighting; `notified` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineRecord {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub category: String,
    pub amount: Decimal,
    pub order_ref: Option<String>,
    pub status: String,
    pub notified: bool,
    pub recorded_at: DateTime<Utc>,
}

/// One delivery attempt for a fine. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub record_id: String,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
    pub success: bool,
}
