use finewatch_db::StoreError;
use thiserror::Error;

/// The upstream fetch failed; the cycle is abandoned and retried next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed upstream payload: {0}")]
    Decode(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// One raw record is unusable. Only that record is skipped.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("negative amount {0}")]
    NegativeAmount(rust_decimal::Decimal),
    #[error("unparseable date {0:?}")]
    BadTimestamp(String),
}

/// A single notify call failed; the fine stays unnotified.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("channel rejected message: {0}")]
    Rejected(String),
}

/// Anything that abandons a whole cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("upstream connectivity probe failed")]
    ProbeFailed,
    #[error(transparent)]
    Store(#[from] StoreError),
}
