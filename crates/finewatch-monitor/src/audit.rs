use std::sync::Arc;

use finewatch_db::Database;
use tracing::warn;

/// Append-only audit of delivery attempts.
///
/// Writing the audit row must never fail a cycle, so store errors are logged
/// and dropped here.
#[derive(Clone)]
pub struct NotificationLog {
    db: Arc<Database>,
}

impl NotificationLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn append(&self, record_id: &str, channel: &str, success: bool) {
        if let Err(e) = self.db.append_attempt(record_id, channel, success) {
            warn!(
                record_id,
                channel,
                success,
                error = %e,
                "failed to write notification attempt"
            );
        }
    }
}
