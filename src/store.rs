//! SQLite transaction store.
//!
//! Records are append-only. The connection lives behind a mutex so inserts
//! are serialized: ids come from `AUTOINCREMENT` and the timestamp is taken
//! while the lock is held, which keeps id order and timestamp order aligned.

use crate::types::record::{DailyFraudCount, DashboardSummary, TransactionRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Persistence capability used by the pipeline
pub trait TransactionStore: Send + Sync {
    /// Append a scored transaction and return the stored record
    fn insert(&self, tx_type: &str, amount: f64, is_fraud: bool) -> Result<TransactionRecord>;

    /// Up to `limit` records, newest first
    fn list_recent(&self, limit: u32) -> Result<Vec<TransactionRecord>>;

    /// Aggregates over every record; zeros on an empty store
    fn summary(&self) -> Result<DashboardSummary>;

    /// Per-day counts, oldest day first
    fn daily_fraud_counts(&self) -> Result<Vec<DailyFraudCount>>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL,
        amount REAL NOT NULL,
        isFraud BOOLEAN NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);
";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed creating store parent dir {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed opening transaction store {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("failed configuring transaction store")?;

        let store = Self::with_connection(conn)?;
        info!(path = %path, "Transaction store opened");
        Ok(store)
    }

    /// In-memory database, used in tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed opening in-memory store")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed initializing transaction schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("store lock poisoned: {}", e))
    }
}

impl TransactionStore for SqliteStore {
    fn insert(&self, tx_type: &str, amount: f64, is_fraud: bool) -> Result<TransactionRecord> {
        let conn = self.lock()?;

        // Stored with microsecond precision
        let timestamp = Utc::now().trunc_subsecs(6);
        conn.execute(
            "INSERT INTO transactions (type, amount, isFraud, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![tx_type, amount, is_fraud, format_timestamp(&timestamp)],
        )
        .context("failed inserting transaction")?;

        Ok(TransactionRecord {
            id: conn.last_insert_rowid(),
            tx_type: tx_type.to_string(),
            amount,
            is_fraud,
            timestamp,
        })
    }

    fn list_recent(&self, limit: u32) -> Result<Vec<TransactionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, type, amount, isFraud, timestamp FROM transactions
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, tx_type, amount, is_fraud, raw_timestamp) = row?;
            records.push(TransactionRecord {
                id,
                tx_type,
                amount,
                is_fraud,
                timestamp: parse_timestamp(&raw_timestamp)?,
            });
        }
        Ok(records)
    }

    fn summary(&self) -> Result<DashboardSummary> {
        let conn = self.lock()?;
        let summary = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN isFraud THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(amount), 0.0)
             FROM transactions",
            [],
            |row| {
                Ok(DashboardSummary {
                    total_transactions: row.get::<_, i64>(0)? as u64,
                    fraudulent_transactions: row.get::<_, i64>(1)? as u64,
                    total_amount: row.get::<_, f64>(2)?,
                })
            },
        )?;
        Ok(summary)
    }

    fn daily_fraud_counts(&self) -> Result<Vec<DailyFraudCount>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT substr(timestamp, 1, 10) AS day,
                    COUNT(*),
                    SUM(CASE WHEN isFraud THEN 1 ELSE 0 END)
             FROM transactions
             GROUP BY day
             ORDER BY day ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (day, total, fraudulent) = row?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .with_context(|| format!("malformed stored date {}", day))?;
            counts.push(DailyFraudCount {
                date,
                total: total as u64,
                fraudulent: fraudulent as u64,
            });
        }
        Ok(counts)
    }
}

/// Fixed-width UTC form so lexical order matches chronological order
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("malformed stored timestamp {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_summary() {
        let store = SqliteStore::in_memory().unwrap();
        let summary = store.summary().unwrap();
        assert_eq!(summary, DashboardSummary::default());
        assert_eq!(summary.total_amount, 0.0);
    }

    #[test]
    fn test_summary_aggregates() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert("TRANSFER", 10.0, true).unwrap();
        store.insert("PAYMENT", 20.0, false).unwrap();
        store.insert("CASH_OUT", 30.0, true).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.fraudulent_transactions, 2);
        assert_eq!(summary.total_amount, 60.0);
    }

    #[test]
    fn test_insert_returns_stored_record() {
        let store = SqliteStore::in_memory().unwrap();
        let first = store.insert("TRANSFER", 10.0, true).unwrap();
        let second = store.insert("PAYMENT", 5.5, false).unwrap();

        assert!(second.id > first.id);
        assert!(second.timestamp >= first.timestamp);

        let listed = store.list_recent(10).unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[0].tx_type, "PAYMENT");
        assert_eq!(listed[0].amount, 5.5);
        assert!(!listed[0].is_fraud);
        assert_eq!(listed[1].timestamp, first.timestamp);
    }

    #[test]
    fn test_list_recent_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        let mut ids = Vec::new();
        for amount in [1.0, 2.0, 3.0] {
            ids.push(store.insert("PAYMENT", amount, false).unwrap().id);
            thread::sleep(std::time::Duration::from_millis(2));
        }

        let recent = store.list_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);
        assert!(recent[0].timestamp > recent[1].timestamp);
    }

    /// Write a row with a fixed timestamp, bypassing the clock in `insert`
    fn insert_at(store: &SqliteStore, tx_type: &str, timestamp: &str) -> i64 {
        let conn = store.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (type, amount, isFraud, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![tx_type, 1.0, false, timestamp],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_equal_timestamps_order_by_id() {
        let store = SqliteStore::in_memory().unwrap();
        let same = "2024-03-01T12:00:00.000000Z";
        let older = insert_at(&store, "DEBIT", "2024-03-01T11:59:59.000000Z");
        let first = insert_at(&store, "PAYMENT", same);
        let second = insert_at(&store, "TRANSFER", same);

        let recent = store.list_recent(10).unwrap();
        let ids: Vec<i64> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first, older]);
        assert_eq!(recent[0].timestamp, recent[1].timestamp);
    }

    #[test]
    fn test_list_recent_zero_limit() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert("PAYMENT", 1.0, false).unwrap();
        assert!(store.list_recent(0).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_inserts_get_unique_ids() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|_| store.insert("TRANSFER", i as f64, false).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.summary().unwrap().total_transactions, 200);
    }

    #[test]
    fn test_daily_fraud_counts() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert("TRANSFER", 10.0, true).unwrap();
        store.insert("PAYMENT", 20.0, false).unwrap();

        let counts = store.daily_fraud_counts().unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].date, Utc::now().date_naive());
        assert_eq!(counts[0].total, 2);
        assert_eq!(counts[0].fraudulent, 1);
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("transactions.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store.insert("DEBIT", 3.0, false).unwrap();
        }

        let reopened = SqliteStore::open(path).unwrap();
        assert_eq!(reopened.summary().unwrap().total_transactions, 1);
    }
}
