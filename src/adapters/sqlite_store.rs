//! SQLite bar store adapter.
//!
//! Caches fetched history per dataset key so repeated backtests over the
//! same range never refetch. `save` is an idempotent overwrite: the key's
//! previous rows are replaced in one transaction.

use chrono::DateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::domain::bar::Bar;
use crate::domain::error::TradewindError;
use crate::ports::bar_store::BarStorePort;
use crate::ports::config_port::ConfigPort;

const DEFAULT_DB_PATH: &str = "db/tradewind.db";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradewindError> {
        let db_path = config
            .get_string("store", "path")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let pool_size = config.get_int("store", "pool_size", 4) as u32;
        Self::open(&db_path, pool_size)
    }

    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, TradewindError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(store_error)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, TradewindError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(store_error)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), TradewindError> {
        let conn = self.pool.get().map_err(store_error)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bars (
                dataset_key TEXT NOT NULL,
                symbol TEXT NOT NULL,
                ts INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (dataset_key, ts)
            );",
        )
        .map_err(store_error)?;
        Ok(())
    }
}

impl BarStorePort for SqliteStore {
    fn load(&self, dataset_key: &str) -> Result<Vec<Bar>, TradewindError> {
        let conn = self.pool.get().map_err(store_error)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, ts, open, high, low, close, volume
                 FROM bars WHERE dataset_key = ?1 ORDER BY ts",
            )
            .map_err(store_error)?;

        let rows = stmt
            .query_map(params![dataset_key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })
            .map_err(store_error)?;

        let mut bars = Vec::new();
        for row in rows {
            let (symbol, ts, open, high, low, close, volume) = row.map_err(store_error)?;
            let timestamp =
                DateTime::from_timestamp_millis(ts).ok_or_else(|| TradewindError::Store {
                    reason: format!("stored timestamp {ts} out of range"),
                })?;
            bars.push(Bar {
                symbol,
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(bars)
    }

    fn save(&self, dataset_key: &str, bars: &[Bar]) -> Result<(), TradewindError> {
        let mut conn = self.pool.get().map_err(store_error)?;
        let tx = conn.transaction().map_err(store_error)?;

        tx.execute("DELETE FROM bars WHERE dataset_key = ?1", params![dataset_key])
            .map_err(store_error)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO bars (dataset_key, symbol, ts, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(store_error)?;
            for bar in bars {
                stmt.execute(params![
                    dataset_key,
                    bar.symbol,
                    bar.timestamp.timestamp_millis(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ])
                .map_err(store_error)?;
            }
        }

        tx.commit().map_err(store_error)
    }
}

fn store_error<E: std::fmt::Display>(e: E) -> TradewindError {
    TradewindError::Store {
        reason: e.to_string(),
    }
}
