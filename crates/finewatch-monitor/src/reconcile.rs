use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use finewatch_db::{Database, NewFine, StoreError};
use finewatch_types::{FineRecord, RawRecord};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::ValidationError;

/// Result of classifying one fetched batch against the store.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Fines first seen in this batch, in batch order.
    pub to_notify: Vec<FineRecord>,
    /// Records that passed validation and were upserted.
    pub reconciled: usize,
    pub validation_errors: usize,
    /// Per-record store failures that did not abort the batch.
    pub store_errors: usize,
}

/// Check the fields a fine cannot do without and build the upsert payload.
///
/// A missing `date` falls back to `now`; a present but unparseable one is
/// rejected.
pub fn validate(raw: &RawRecord, now: DateTime<Utc>) -> Result<NewFine, ValidationError> {
    let id = required(&raw.id, "id")?;
    let category = required(&raw.kind, "type")?;
    let amount = raw.amount.ok_or(ValidationError::MissingField("amount"))?;
    let status = required(&raw.status, "status")?;

    if amount < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount(amount));
    }

    let occurred_at = match raw.date.as_deref().map(str::trim) {
        None | Some("") => now,
        Some(s) => parse_timestamp(s).ok_or_else(|| ValidationError::BadTimestamp(s.to_string()))?,
    };

    let order_ref = raw
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(NewFine {
        id,
        occurred_at,
        category,
        amount,
        order_ref,
        status,
    })
}

/// Decode one upstream entry and validate it.
pub fn validate_entry(entry: &Value, now: DateTime<Utc>) -> Result<NewFine, ValidationError> {
    let raw = RawRecord::from_entry(entry).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    validate(&raw, now)
}

/// Upsert every entry of `batch` and collect the ones needing an alert.
///
/// A record needs an alert only if this call inserted it and it is not yet
/// notified, so an id repeated within the batch is offered once. Only
/// `StoreError::Unavailable` aborts; everything else is per record.
pub fn reconcile(db: &Database, batch: &[Value]) -> Result<Reconciliation, StoreError> {
    let mut out = Reconciliation::default();
    let now = Utc::now();

    for entry in batch {
        let fine = match validate_entry(entry, now) {
            Ok(fine) => fine,
            Err(e) => {
                warn!(id = %entry_id(entry), error = %e, "skipping invalid fine");
                out.validation_errors += 1;
                continue;
            }
        };

        match db.upsert_fine(&fine) {
            Ok((stored, is_new)) => {
                out.reconciled += 1;
                if is_new && !stored.notified {
                    debug!(id = %stored.id, "new fine");
                    out.to_notify.push(stored);
                }
            }
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                error!(id = %fine.id, error = %e, "failed to store fine");
                out.store_errors += 1;
            }
        }
    }

    Ok(out)
}

/// Best-effort id for log lines about entries that failed to decode.
fn entry_id(entry: &Value) -> String {
    match entry.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(field))
}

/// RFC 3339, a zone-less ISO-8601 timestamp taken as UTC, or a bare date
/// taken as midnight UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
