use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use finewatch_db::Database;
use finewatch_types::FineRecord;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audit::NotificationLog;
use crate::error::{CycleError, FetchError, MonitorError};
use crate::reconcile::reconcile;
use crate::source::{FineSource, Notifier};

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub fetch_timeout: Duration,
    /// How far back each fetch asks upstream to look.
    pub lookback: Duration,
    /// Re-offer unnotified fines that upstream may no longer return.
    pub redrive_backlog: bool,
    /// Minimum time since first sighting before a fine counts as backlog.
    pub backlog_min_age: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            lookback: Duration::from_secs(24 * 3600),
            redrive_backlog: false,
            backlog_min_age: Duration::from_secs(300),
        }
    }
}

/// Counters for one fetch → reconcile → notify pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub fetched: usize,
    /// Fines first seen this cycle.
    pub new_records: usize,
    /// Alerts confirmed by the channel, backlog included.
    pub notified: usize,
    pub failed: usize,
    pub validation_errors: usize,
    pub redriven: usize,
    /// The cycle was abandoned by a fetch or store failure.
    pub aborted: bool,
}

pub struct PollLoop {
    db: Arc<Database>,
    source: Arc<dyn FineSource>,
    notifier: Arc<dyn Notifier>,
    log: NotificationLog,
    config: PollConfig,
}

impl PollLoop {
    pub fn new(
        db: Arc<Database>,
        source: Arc<dyn FineSource>,
        notifier: Arc<dyn Notifier>,
        config: PollConfig,
    ) -> Self {
        let log = NotificationLog::new(db.clone());
        Self {
            db,
            source,
            notifier,
            log,
            config,
        }
    }

    /// Probe upstream once, then run until `shutdown` fires.
    pub async fn run_checked(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), MonitorError> {
        info!("Checking upstream connectivity...");
        if !self.source.test_connection().await {
            error!("Upstream API is unreachable, not starting");
            return Err(MonitorError::ProbeFailed);
        }
        info!("Upstream API reachable");

        self.run(shutdown).await;
        Ok(())
    }

    /// Run cycles until `shutdown` fires.
    ///
    /// The token is only observed between cycles, so a cycle that has
    /// started always drains its notify-list. Each cycle runs in its own
    /// task; a panic inside one is logged and treated as a failed cycle.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            channel = self.notifier.channel(),
            "Starting fine monitoring"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let this = self.clone();
            match tokio::spawn(async move { this.run_cycle().await }).await {
                Ok(outcome) => debug!(?outcome, "cycle finished"),
                Err(e) => error!(error = %e, "cycle task failed"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Fine monitoring stopped");
    }

    /// One cycle. Never fails: errors are logged and reported as an aborted
    /// outcome with nothing notified.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match self.try_cycle().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Fine check failed");
                CycleOutcome {
                    aborted: true,
                    ..Default::default()
                }
            }
        }
    }

    async fn try_cycle(&self) -> Result<CycleOutcome, CycleError> {
        info!("Checking for new fines...");

        let batch = tokio::time::timeout(
            self.config.fetch_timeout,
            self.source.fetch_records(self.config.lookback),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.config.fetch_timeout))??;

        let mut outcome = CycleOutcome {
            fetched: batch.len(),
            ..Default::default()
        };
        let mut offered = HashSet::new();

        if batch.is_empty() {
            info!("No fines reported");
        } else {
            let rec = reconcile(&self.db, &batch)?;
            outcome.new_records = rec.to_notify.len();
            outcome.validation_errors = rec.validation_errors;

            for record in &rec.to_notify {
                offered.insert(record.id.clone());
                self.deliver(record, &mut outcome).await;
            }
        }

        if self.config.redrive_backlog {
            self.redrive(&offered, &mut outcome).await;
        }

        if outcome.notified > 0 {
            info!(count = outcome.notified, "New fines notified");
            self.send_summary(outcome.notified).await;
        } else {
            info!(fetched = outcome.fetched, "Fines checked, none new");
        }

        Ok(outcome)
    }

    /// Exactly one attempt. Success marks the fine before the audit row is
    /// written; failure leaves it unnotified.
    async fn deliver(&self, record: &FineRecord, outcome: &mut CycleOutcome) {
        let channel = self.notifier.channel();

        match self.notifier.send_record_alert(record).await {
            Ok(()) => {
                if let Err(e) = self.db.mark_notified(&record.id) {
                    error!(id = %record.id, error = %e, "Alert sent but fine not marked notified");
                }
                self.log.append(&record.id, channel, true);
                outcome.notified += 1;
                info!(
                    id = %record.id,
                    category = %record.category,
                    amount = %record.amount,
                    "New fine notified"
                );
            }
            Err(e) => {
                self.log.append(&record.id, channel, false);
                outcome.failed += 1;
                error!(id = %record.id, error = %e, "Failed to send fine alert");
            }
        }
    }

    async fn redrive(&self, offered: &HashSet<String>, outcome: &mut CycleOutcome) {
        let cutoff = chrono::Duration::from_std(self.config.backlog_min_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let backlog = match self.db.list_unnotified(cutoff) {
            Ok(backlog) => backlog,
            Err(e) => {
                warn!(error = %e, "Could not load unnotified backlog");
                return;
            }
        };

        for record in backlog.iter().filter(|r| !offered.contains(&r.id)) {
            debug!(id = %record.id, "Re-offering unnotified fine");
            outcome.redriven += 1;
            self.deliver(record, outcome).await;
        }
    }

    async fn send_summary(&self, new_count: usize) {
        let total = match self.db.count_fines() {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, "Could not count fines, skipping status summary");
                return;
            }
        };

        if let Err(e) = self.notifier.send_status_summary(new_count, total).await {
            warn!(error = %e, "Failed to send status summary");
        }
    }
}
