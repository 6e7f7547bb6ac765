use crate::error::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (fines + notification_attempts)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE fines (
                id           TEXT PRIMARY KEY,
                occurred_at  TEXT NOT NULL,
                category     TEXT NOT NULL,
                amount       TEXT NOT NULL,
                order_ref    TEXT,
                status       TEXT NOT NULL,
                recorded_at  TEXT NOT NULL,
                notified     INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_fines_unnotified
                ON fines(notified, recorded_at);

            -- record_id is a weak reference: no foreign key on purpose
            CREATE TABLE notification_attempts (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id  TEXT NOT NULL,
                channel    TEXT NOT NULL,
                sent_at    TEXT NOT NULL,
                success    INTEGER NOT NULL
            );

            CREATE INDEX idx_attempts_record
                ON notification_attempts(record_id, id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_rerunnable() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
