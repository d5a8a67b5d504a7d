use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::roster::{Classification, Record};

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

/// Identifies one processing run in the store.
#[derive(Debug, Clone)]
pub struct RunRow<'a> {
    pub run_id: &'a str,
    pub started_at: &'a str,
    pub source_sha256: &'a str,
    pub requested_routes: &'a [String],
}

pub fn open_store(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
          run_id TEXT PRIMARY KEY,
          started_at TEXT NOT NULL,
          source_sha256 TEXT NOT NULL,
          requested_routes TEXT NOT NULL,
          record_count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
          run_id TEXT NOT NULL,
          record_idx INTEGER NOT NULL,
          page INTEGER NOT NULL,
          row_idx INTEGER NOT NULL,
          primary_name TEXT NOT NULL,
          secondary_name TEXT NOT NULL,
          birth_date TEXT NOT NULL,
          occurrence TEXT NOT NULL,
          registered_on TEXT NOT NULL,
          unit_label TEXT NOT NULL,
          PRIMARY KEY(run_id, record_idx),
          FOREIGN KEY(run_id) REFERENCES runs(run_id)
        );

        CREATE TABLE IF NOT EXISTS classifications (
          run_id TEXT NOT NULL,
          record_idx INTEGER NOT NULL,
          precinct_code TEXT NOT NULL,
          route TEXT NOT NULL,
          PRIMARY KEY(run_id, record_idx),
          FOREIGN KEY(run_id, record_idx) REFERENCES records(run_id, record_idx)
        );

        CREATE INDEX IF NOT EXISTS idx_classifications_route
          ON classifications(run_id, route, precinct_code);
        ",
        )
        .context("failed to create store schema")?;

    connection
        .execute(
            "
            INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value
            ",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

/// Stores one run's records and, separately, their classifications.
/// Re-running with the same run id replaces the earlier rows.
pub fn record_run(
    connection: &mut Connection,
    run: &RunRow<'_>,
    records: &[Record],
    classification: &Classification,
) -> Result<usize> {
    let tx = connection.transaction()?;

    tx.execute(
        "DELETE FROM classifications WHERE run_id = ?1",
        params![run.run_id],
    )?;
    tx.execute("DELETE FROM records WHERE run_id = ?1", params![run.run_id])?;
    tx.execute(
        "
        INSERT INTO runs(run_id, started_at, source_sha256, requested_routes, record_count)
        VALUES(?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(run_id) DO UPDATE SET
          started_at=excluded.started_at,
          source_sha256=excluded.source_sha256,
          requested_routes=excluded.requested_routes,
          record_count=excluded.record_count
        ",
        params![
            run.run_id,
            run.started_at,
            run.source_sha256,
            run.requested_routes.join(","),
            records.len() as i64
        ],
    )?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO records(
              run_id, record_idx, page, row_idx, primary_name, secondary_name,
              birth_date, occurrence, registered_on, unit_label
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )?;

        for (index, record) in records.iter().enumerate() {
            statement.execute(params![
                run.run_id,
                index as i64,
                record.page as i64,
                record.row as i64,
                &record.primary_name,
                &record.secondary_name,
                &record.birth_date,
                &record.occurrence,
                &record.registered_on,
                &record.unit_label
            ])?;
        }
    }

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO classifications(run_id, record_idx, precinct_code, route)
            VALUES(?1, ?2, ?3, ?4)
            ",
        )?;

        for entry in &classification.classified {
            statement.execute(params![
                run.run_id,
                entry.record as i64,
                entry.code.as_str(),
                entry.route.as_str()
            ])?;
        }
    }

    tx.commit()?;
    Ok(records.len())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Classifier, RosterConfig, reconcile};

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn sample() -> (Vec<Record>, Classification) {
        let config = RosterConfig::builtin().expect("builtin");
        let pages = vec![vec![
            vec![cell("Delegacia : 5a DP"), None, None, None, None],
            vec![cell("ANA"), cell("MAE"), cell("01/01/1990"), cell("ART"), cell("02/02/2020")],
            vec![cell("Delegacia : 3a DP"), None, None, None, None],
            vec![cell("BRUNO"), cell("MAE"), cell("01/01/1991"), cell("ART"), cell("02/02/2020")],
        ]];
        let records = reconcile(pages, &config)
            .expect("reconcile")
            .assembly
            .records;
        let classification = Classifier::new(&config).classify(&records);
        (records, classification)
    }

    #[test]
    fn record_run_stores_records_and_classifications_separately() {
        let mut connection = Connection::open_in_memory().expect("open");
        ensure_schema(&connection).expect("schema");
        let (records, classification) = sample();
        let routes = vec!["leste".to_string()];
        let run = RunRow {
            run_id: "run-20260101T000000Z",
            started_at: "2026-01-01T00:00:00Z",
            source_sha256: "abc",
            requested_routes: &routes,
        };

        let stored = record_run(&mut connection, &run, &records, &classification).expect("store");
        record_run(&mut connection, &run, &records, &classification).expect("store again");

        assert_eq!(stored, 2);
        assert_eq!(count_rows(&connection, "SELECT COUNT(*) FROM runs").expect("runs"), 1);
        assert_eq!(
            count_rows(&connection, "SELECT COUNT(*) FROM records").expect("records"),
            2
        );
        assert_eq!(
            count_rows(&connection, "SELECT COUNT(*) FROM classifications").expect("classes"),
            1
        );
        let route: String = connection
            .query_row(
                "SELECT route FROM classifications WHERE record_idx = 0",
                [],
                |row| row.get(0),
            )
            .expect("route");
        assert_eq!(route, "leste");
    }
}
