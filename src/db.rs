// 🗄️ Persistence - idempotent upsert of projections into SQLite
// Rows are keyed by their natural id; ids already present are skipped, never
// overwritten. Each upsert commits its own transaction.

use crate::projection::{CustomerRow, TransactionRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

// ============================================================================
// KEYED ROWS
// ============================================================================

/// A row that can be upserted by natural key
pub trait KeyedRow {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;

    fn natural_key(&self) -> &str;

    /// Plain INSERT; a primary-key collision surfaces as a constraint violation
    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize>;
}

impl KeyedRow for CustomerRow {
    const TABLE: &'static str = "customers";
    const KEY_COLUMN: &'static str = "customer_id";

    fn natural_key(&self) -> &str {
        &self.customer_id
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO customers (customer_id, customer_name, created_on) VALUES (?1, ?2, ?3)",
            params![self.customer_id, self.customer_name, self.created_on.to_rfc3339()],
        )
    }
}

impl KeyedRow for TransactionRow {
    const TABLE: &'static str = "transactions";
    const KEY_COLUMN: &'static str = "transaction_id";

    fn natural_key(&self) -> &str {
        &self.transaction_id
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO transactions (
                transaction_id, customer_id, transaction_date, currency, amount, created_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.transaction_id,
                self.customer_id,
                self.transaction_date.format("%Y-%m-%d").to_string(),
                self.currency,
                self.amount,
                self.created_on.to_rfc3339(),
            ],
        )
    }
}

// ============================================================================
// LOAD EVENTS (audit trail)
// ============================================================================

/// One upsert call, recorded for audit
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoadEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub table_name: String,
    pub batch_file: String,
    pub rows_offered: usize,
    pub rows_inserted: usize,
}

impl LoadEvent {
    pub fn new(table_name: &str, batch_file: &str, rows_offered: usize, rows_inserted: usize) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            table_name: table_name.to_string(),
            batch_file: batch_file.to_string(),
            rows_offered,
            rows_inserted,
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            customer_id TEXT NOT NULL PRIMARY KEY,
            customer_name TEXT NOT NULL,
            created_on TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            transaction_id TEXT NOT NULL PRIMARY KEY,
            customer_id TEXT NOT NULL,
            transaction_date TEXT,
            currency TEXT,
            amount REAL,
            created_on TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS load_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            table_name TEXT NOT NULL,
            batch_file TEXT NOT NULL,
            rows_offered INTEGER NOT NULL,
            rows_inserted INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_customer ON transactions(customer_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// UPSERT
// ============================================================================

/// Insert rows whose natural key is not yet present; returns rows inserted.
/// Zero new rows is a normal outcome, not an error.
pub fn upsert<R: KeyedRow>(conn: &mut Connection, rows: &[R], batch_file: &str) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut inserted = 0;
    let mut skipped = 0;

    for row in rows {
        match row.insert(&tx) {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to insert {} = {} into {}",
                        R::KEY_COLUMN,
                        row.natural_key(),
                        R::TABLE
                    )
                })
            }
        }
    }

    insert_load_event(&tx, &LoadEvent::new(R::TABLE, batch_file, rows.len(), inserted))?;
    tx.commit()?;

    if inserted == 0 {
        tracing::info!(table = R::TABLE, "{} table already up to date", R::TABLE);
    } else {
        tracing::info!(table = R::TABLE, inserted, skipped, "upserted rows");
    }

    Ok(inserted)
}

/// Rows inserted per table by one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub customers_inserted: usize,
    pub transactions_inserted: usize,
}

/// Upsert both projections; each table commits independently
pub fn load_projections(
    conn: &mut Connection,
    customers: &[CustomerRow],
    transactions: &[TransactionRow],
    batch_file: &str,
) -> Result<LoadSummary> {
    Ok(LoadSummary {
        customers_inserted: upsert(conn, customers, batch_file)?,
        transactions_inserted: upsert(conn, transactions, batch_file)?,
    })
}

pub fn insert_load_event(conn: &Connection, event: &LoadEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO load_events (
            event_id, timestamp, table_name, batch_file, rows_offered, rows_inserted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.table_name,
            event.batch_file,
            event.rows_offered as i64,
            event.rows_inserted as i64,
        ],
    )?;

    Ok(())
}

pub fn get_load_events(conn: &Connection, table_name: &str) -> Result<Vec<LoadEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, table_name, batch_file, rows_offered, rows_inserted
         FROM load_events WHERE table_name = ?1 ORDER BY id",
    )?;

    let events = stmt
        .query_map(params![table_name], |row| {
            let timestamp: String = row.get(1)?;
            let rows_offered: i64 = row.get(4)?;
            let rows_inserted: i64 = row.get(5)?;
            Ok((
                row.get::<_, String>(0)?,
                timestamp,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                rows_offered,
                rows_inserted,
            ))
        })?
        .map(|r| -> Result<LoadEvent> {
            let (event_id, timestamp, table_name, batch_file, offered, inserted) = r?;
            Ok(LoadEvent {
                event_id,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .context("Invalid load event timestamp")?
                    .with_timezone(&Utc),
                table_name,
                batch_file,
                rows_offered: offered as usize,
                rows_inserted: inserted as usize,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(events)
}

/// Row count of one of the pipeline tables
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let table = match table {
        "customers" | "transactions" | "load_events" => table,
        other => anyhow::bail!("Unknown table: {}", other),
    };

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
