pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info};

pub use error::{Result, StoreError};
pub use models::NewFine;

/// SQLite-backed store for fines and their notification attempts.
///
/// A single connection sits behind a mutex, so every write is serialized.
/// That is what makes `upsert_fine` atomic per id without row locks.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::unavailable)?;

        // WAL mode so audit readers don't block the poller
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::unavailable)?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        // A panic under the lock leaves the connection usable once any
        // transaction it left open is rolled back.
        let mut conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => {
                error!("Database lock poisoned by a panic, recovering connection");
                self.conn.clear_poison();
                let conn = poisoned.into_inner();
                if !conn.is_autocommit() {
                    conn.execute_batch("ROLLBACK")?;
                }
                conn
            }
        };
        f(&mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewFine;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[test]
    fn survives_panic_under_lock() {
        let db = Database::open_in_memory().unwrap();

        std::thread::scope(|s| {
            let handle = s.spawn(|| {
                db.with_conn(|conn| -> Result<()> {
                    conn.execute_batch("BEGIN IMMEDIATE")?;
                    panic!("handler blew up mid-write");
                })
            });
            assert!(handle.join().is_err());
        });
        assert!(db.conn.is_poisoned());

        let fine = NewFine {
            id: "F1".to_string(),
            occurred_at: Utc::now(),
            category: "Late delivery".to_string(),
            amount: Decimal::from(100),
            order_ref: None,
            status: "charged".to_string(),
        };
        let (_, is_new) = db.upsert_fine(&fine).unwrap();
        assert!(is_new);
        assert_eq!(db.count_fines().unwrap(), 1);
        assert!(!db.conn.is_poisoned());
    }
}
