//! The poll-dedupe-notify core.
//!
//! [`PollLoop`] drives fetch → reconcile → notify cycles. The store is the
//! only record of which fines have been seen, so a restart resumes exactly
//! where the last committed cycle left off.

pub mod audit;
pub mod error;
pub mod poll;
pub mod reconcile;
pub mod source;

pub use audit::NotificationLog;
pub use error::{CycleError, FetchError, MonitorError, NotifyError, ValidationError};
pub use poll::{CycleOutcome, PollConfig, PollLoop};
pub use reconcile::{Reconciliation, reconcile, validate, validate_entry};
pub use source::{FineSource, Notifier};
