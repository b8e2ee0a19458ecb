//! Database layer for LabFlow.

mod schema;
mod activity;
mod cases;
mod doctors;
mod materials;
mod staff;

pub use schema::*;
#[allow(unused_imports)]
pub use activity::*;
#[allow(unused_imports)]
pub use cases::*;
#[allow(unused_imports)]
pub use doctors::*;
pub use materials::*;
#[allow(unused_imports)]
pub use staff::*;

pub(crate) use cases::{read_case, write_case_state};

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::LabConfig;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::open_with_timeout(path, Duration::from_millis(crate::config::DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Open the database named by a config.
    pub fn open_with_config(config: &LabConfig) -> DbResult<Self> {
        Self::open_with_timeout(&config.database_path, config.busy_timeout())
    }

    fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // WAL lets readers proceed while a ledger transaction holds the write lock
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction that takes the write lock up front.
    ///
    /// Every read-then-write unit (status moves, stock movements, invoice
    /// flips, case numbering) runs inside one of these so no other writer can
    /// interleave between the read and the write.
    pub fn immediate(&self) -> DbResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

/// Current UTC timestamp in the stored format.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Decimals are stored as canonical text so stock arithmetic stays exact.
pub(crate) fn decimal_to_sql(value: Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn decimal_from_sql(field: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| DbError::Corrupt(format!("invalid decimal in {}: {} ({})", field, raw, e)))
}
