use chrono::{DateTime, Utc};
use finewatch_types::{FineRecord, NotificationAttempt};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{AttemptRow, FineRow, NewFine, format_ts};

const FINE_COLUMNS: &str =
    "id, occurred_at, category, amount, order_ref, status, recorded_at, notified";

impl Database {
    // -- Fines --

    /// Insert a fine on first sighting, refresh its mutable fields otherwise.
    /// Returns the stored row and whether it was inserted by this call.
    pub fn upsert_fine(&self, fine: &NewFine) -> Result<(FineRecord, bool)> {
        self.upsert_fine_at(fine, Utc::now())
    }

    /// `upsert_fine` with an explicit `recorded_at` for the insert case.
    pub fn upsert_fine_at(
        &self,
        fine: &NewFine,
        recorded_at: DateTime<Utc>,
    ) -> Result<(FineRecord, bool)> {
        self.with_conn(|conn| {
            // IMMEDIATE takes the write lock up front; dropping `tx` on any
            // error path rolls back.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists: bool = tx
                .query_row("SELECT 1 FROM fines WHERE id = ?1", [&fine.id], |_| Ok(()))
                .optional()?
                .is_some();

            if exists {
                tx.execute(
                    "UPDATE fines SET category = ?2, amount = ?3, status = ?4 WHERE id = ?1",
                    rusqlite::params![fine.id, fine.category, fine.amount.to_string(), fine.status],
                )?;
            } else {
                tx.execute(
                    "INSERT INTO fines (id, occurred_at, category, amount, order_ref, status, recorded_at, notified)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                    rusqlite::params![
                        fine.id,
                        format_ts(fine.occurred_at),
                        fine.category,
                        fine.amount.to_string(),
                        fine.order_ref,
                        fine.status,
                        format_ts(recorded_at),
                    ],
                )?;
            }

            let stored = query_fine(&tx, &fine.id)?.ok_or_else(|| StoreError::CorruptRow {
                id: fine.id.clone(),
                reason: "row vanished inside its own transaction".into(),
            })?;

            tx.commit()?;
            Ok((stored, !exists))
        })
    }

    /// Flip `notified` to true. Returns whether this call changed anything;
    /// an unknown id or an already-notified row is not an error.
    pub fn mark_notified(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE fines SET notified = 1 WHERE id = ?1 AND notified = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_fine(&self, id: &str) -> Result<Option<FineRecord>> {
        self.with_conn(|conn| query_fine(conn, id))
    }

    pub fn count_fines(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM fines", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }

    /// Fines still waiting for a confirmed notification that were first
    /// recorded before `recorded_before`, oldest first.
    pub fn list_unnotified(&self, recorded_before: DateTime<Utc>) -> Result<Vec<FineRecord>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {FINE_COLUMNS} FROM fines
                 WHERE notified = 0 AND recorded_at < ?1
                 ORDER BY recorded_at, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([format_ts(recorded_before)], map_fine_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(FineRecord::try_from).collect()
        })
    }

    // -- Notification attempts --

    pub fn append_attempt(&self, record_id: &str, channel: &str, success: bool) -> Result<()> {
        self.append_attempt_at(record_id, channel, success, Utc::now())
    }

    pub fn append_attempt_at(
        &self,
        record_id: &str,
        channel: &str,
        success: bool,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notification_attempts (record_id, channel, sent_at, success)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![record_id, channel, format_ts(sent_at), success],
            )?;
            Ok(())
        })
    }

    /// Attempts for one fine in the order they were appended.
    pub fn attempts_for(&self, record_id: &str) -> Result<Vec<NotificationAttempt>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT record_id, channel, sent_at, success
                 FROM notification_attempts
                 WHERE record_id = ?1
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([record_id], |row| {
                    Ok(AttemptRow {
                        record_id: row.get(0)?,
                        channel: row.get(1)?,
                        sent_at: row.get(2)?,
                        success: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(NotificationAttempt::try_from).collect()
        })
    }
}

fn query_fine(conn: &Connection, id: &str) -> Result<Option<FineRecord>> {
    let sql = format!("SELECT {FINE_COLUMNS} FROM fines WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_fine_row).optional()?;

    row.map(FineRecord::try_from).transpose()
}

fn map_fine_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FineRow> {
    Ok(FineRow {
        id: row.get(0)?,
        occurred_at: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        order_ref: row.get(4)?,
        status: row.get(5)?,
        recorded_at: row.get(6)?,
        notified: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn fine(id: &str, status: &str) -> NewFine {
        NewFine {
            id: id.to_string(),
            occurred_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            category: "Late delivery".to_string(),
            amount: Decimal::new(150000, 2),
            order_ref: Some("ORDER_100001".to_string()),
            status: status.to_string(),
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let f = fine("F1", "charged");

        let (first, is_new) = db.upsert_fine(&f).unwrap();
        assert!(is_new);
        assert!(!first.notified);
        assert_eq!(first.amount, Decimal::new(1500, 0));

        let (second, is_new) = db.upsert_fine(&f).unwrap();
        assert!(!is_new);
        assert_eq!(second.recorded_at, first.recorded_at);
        assert_eq!(db.count_fines().unwrap(), 1);
    }

    #[test]
    fn resighting_refreshes_status_but_keeps_notified() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_fine(&fine("F1", "charged")).unwrap();
        assert!(db.mark_notified("F1").unwrap());

        let mut changed = fine("F1", "disputed");
        changed.amount = Decimal::new(999, 0);
        changed.order_ref = Some("ORDER_OTHER".to_string());
        let (stored, is_new) = db.upsert_fine(&changed).unwrap();

        assert!(!is_new);
        assert!(stored.notified);
        assert_eq!(stored.status, "disputed");
        assert_eq!(stored.amount, Decimal::new(999, 0));
        // order_ref is fixed at first sighting
        assert_eq!(stored.order_ref.as_deref(), Some("ORDER_100001"));
    }

    #[test]
    fn mark_notified_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_fine(&fine("F1", "charged")).unwrap();

        assert!(db.mark_notified("F1").unwrap());
        assert!(!db.mark_notified("F1").unwrap());
        assert!(db.get_fine("F1").unwrap().unwrap().notified);
    }

    #[test]
    fn mark_notified_unknown_id_is_silent() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.mark_notified("missing").unwrap());
        assert_eq!(db.count_fines().unwrap(), 0);
    }

    #[test]
    fn get_fine_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_fine("nope").unwrap().is_none());
    }

    #[test]
    fn list_unnotified_filters_by_age_and_flag() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.upsert_fine_at(&fine("OLD", "charged"), now - Duration::minutes(30)).unwrap();
        db.upsert_fine_at(&fine("OLDER", "charged"), now - Duration::minutes(60)).unwrap();
        db.upsert_fine_at(&fine("DONE", "charged"), now - Duration::minutes(60)).unwrap();
        db.upsert_fine_at(&fine("FRESH", "charged"), now).unwrap();
        db.mark_notified("DONE").unwrap();

        let backlog = db.list_unnotified(now - Duration::minutes(5)).unwrap();
        let ids: Vec<_> = backlog.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["OLDER", "OLD"]);
    }

    #[test]
    fn attempts_are_appended_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.append_attempt("F1", "telegram", false).unwrap();
        db.append_attempt("F1", "telegram", true).unwrap();
        db.append_attempt("F2", "telegram", true).unwrap();

        let attempts = db.attempts_for("F1").unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(!attempts[0].success);
        assert!(attempts[1].success);
        assert!(attempts.iter().all(|a| a.channel == "telegram"));
    }

    #[test]
    fn attempts_do_not_require_a_fine_row() {
        let db = Database::open_in_memory().unwrap();
        db.append_attempt("ghost", "telegram", true).unwrap();
        assert_eq!(db.attempts_for("ghost").unwrap().len(), 1);
    }

    #[test]
    fn corrupt_amount_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_fine(&fine("F1", "charged")).unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE fines SET amount = 'lots' WHERE id = 'F1'", [])?;
            Ok(())
        })
        .unwrap();

        let err = db.get_fine("F1").unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { .. }));
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "finewatch-reopen-{}-{}.db",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        {
            let db = Database::open(&path).unwrap();
            db.upsert_fine(&fine("F1", "charged")).unwrap();
            db.mark_notified("F1").unwrap();
        }

        let db = Database::open(&path).unwrap();
        let (stored, is_new) = db.upsert_fine(&fine("F1", "paid")).unwrap();
        assert!(!is_new);
        assert!(stored.notified);

        drop(db);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
