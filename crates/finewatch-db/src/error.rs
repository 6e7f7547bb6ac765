use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database cannot be reached right now. Callers abort the cycle
    /// and retry on the next tick.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("corrupt row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

impl StoreError {
    pub(crate) fn unavailable(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let connection_level = matches!(
            err.sqlite_error_code(),
            Some(
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::NotADatabase
                    | ErrorCode::DiskFull
                    | ErrorCode::ReadOnly
            )
        );
        if connection_level {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Sqlite(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_is_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(StoreError::from(err).is_unavailable());
    }

    #[test]
    fn missing_row_is_not_unavailable() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_unavailable());
    }
}
