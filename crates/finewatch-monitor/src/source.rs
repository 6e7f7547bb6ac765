use std::time::Duration;

use async_trait::async_trait;
use finewatch_types::FineRecord;
use serde_json::Value;

use crate::error::{FetchError, NotifyError};

/// Where fines come from.
#[async_trait]
pub trait FineSource: Send + Sync {
    /// Fines reported upstream within the last `since`.
    async fn fetch_records(&self, since: Duration) -> Result<Vec<Value>, FetchError>;

    /// Checked once before the loop starts.
    async fn test_connection(&self) -> bool;
}

/// Where alerts go.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name recorded in the notification log, e.g. `telegram`.
    fn channel(&self) -> &str;

    /// `Ok` only once delivery is confirmed by the channel.
    async fn send_record_alert(&self, record: &FineRecord) -> Result<(), NotifyError>;

    async fn send_status_summary(&self, new_count: usize, total_count: u64)
    -> Result<(), NotifyError>;
}
