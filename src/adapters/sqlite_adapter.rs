//! SQLite observation store and forecast ledger.

use crate::adapters::migrations::{MIGRATIONS, SQLITE_MIGRATIONS_TABLE};
use crate::domain::error::StockcastError;
use crate::domain::forecast::{Forecast, ForecastResult, ScoredForecast};
use crate::domain::observation::Observation;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::ForecastLedger;
use crate::ports::observation_port::ObservationStore;
use chrono::{NaiveDate, Utc};
use log::info;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

const DATE_FORMAT: &str = "%Y-%m-%d";

const OBSERVATION_COLUMNS: &str = "s.name, o.date, o.open, o.high, o.low, o.close, \
                                   o.volume, o.trade_count, o.vwap";

const FORECAST_COLUMNS: &str = "f.id, s.name, f.date, st.name, f.predicted_close";

const FORECAST_JOINS: &str = "FROM forecasts f
                              JOIN symbols s ON s.id = f.symbol_id
                              JOIN strategies st ON st.id = f.strategy_id";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> StockcastError {
    StockcastError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockcastError {
    StockcastError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn with_pragmas(manager: SqliteConnectionManager) -> SqliteConnectionManager {
    manager.with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    })
}

fn parse_date(date_str: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            date_str.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn observation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Observation> {
    Ok(Observation {
        symbol: row.get(0)?,
        date: parse_date(row.get(1)?)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
        trade_count: row.get(7)?,
        vwap: row.get(8)?,
    })
}

fn forecast_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Forecast> {
    Ok(Forecast {
        id: row.get(0)?,
        symbol: row.get(1)?,
        date: parse_date(row.get(2)?)?,
        strategy: row.get(3)?,
        predicted_close: row.get(4)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StockcastError> {
    rows.map(|row| row.map_err(query_err)).collect()
}

/// Id of a symbol, created on first use.
fn ensure_symbol(conn: &Connection, symbol: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT OR IGNORE INTO symbols (name) VALUES (?1)", params![symbol])?;
    conn.query_row("SELECT id FROM symbols WHERE name = ?1", params![symbol], |row| row.get(0))
}

/// Id of a strategy, created on first use.
fn ensure_strategy(conn: &Connection, strategy: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT OR IGNORE INTO strategies (name) VALUES (?1)", params![strategy])?;
    conn.query_row("SELECT id FROM strategies WHERE name = ?1", params![strategy], |row| {
        row.get(0)
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockcastError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| StockcastError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = with_pragmas(SqliteConnectionManager::file(&db_path));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every pooled handle sees the
    /// same data.
    pub fn in_memory() -> Result<Self, StockcastError> {
        let manager = with_pragmas(SqliteConnectionManager::memory());
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockcastError> {
        self.pool.get().map_err(db_err)
    }

    /// Apply pending migrations. Returns how many were applied.
    pub fn initialize_schema(&self) -> Result<usize, StockcastError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        tx.execute_batch(SQLITE_MIGRATIONS_TABLE).map_err(query_err)?;
        let current: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .map_err(query_err)?;

        let mut applied = 0;
        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            tx.execute_batch(migration.sqlite).map_err(query_err)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, Utc::now().to_rfc3339()],
            )
            .map_err(query_err)?;
            info!("Applied migration {} ({})", migration.version, migration.name);
            applied += 1;
        }

        tx.commit().map_err(query_err)?;
        Ok(applied)
    }

    pub fn schema_version(&self) -> Result<i64, StockcastError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(query_err)
    }
}

impl ObservationStore for SqliteAdapter {
    fn register_symbol(&self, symbol: &str) -> Result<(), StockcastError> {
        let conn = self.conn()?;
        ensure_symbol(&conn, symbol).map_err(query_err)?;
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockcastError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT name FROM symbols ORDER BY name")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;
        collect_rows(rows)
    }

    fn latest(&self, symbol: &str) -> Result<Option<Observation>, StockcastError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {OBSERVATION_COLUMNS}
             FROM observations o JOIN symbols s ON s.id = o.symbol_id
             WHERE s.name = ?1
             ORDER BY o.date DESC
             LIMIT 1"
        );
        conn.query_row(&query, params![symbol], observation_from_row)
            .optional()
            .map_err(query_err)
    }

    fn all(&self, symbol: &str) -> Result<Vec<Observation>, StockcastError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {OBSERVATION_COLUMNS}
             FROM observations o JOIN symbols s ON s.id = o.symbol_id
             WHERE s.name = ?1
             ORDER BY o.date ASC"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt
            .query_map(params![symbol], observation_from_row)
            .map_err(query_err)?;
        collect_rows(rows)
    }

    fn insert_if_absent(&self, observation: &Observation) -> Result<bool, StockcastError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let symbol_id = ensure_symbol(&tx, &observation.symbol).map_err(query_err)?;
        let changed = tx
            .execute(
                "INSERT OR IGNORE INTO observations
                     (symbol_id, date, open, high, low, close, volume, trade_count, vwap)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    symbol_id,
                    format_date(observation.date),
                    observation.open,
                    observation.high,
                    observation.low,
                    observation.close,
                    observation.volume,
                    observation.trade_count,
                    observation.vwap
                ],
            )
            .map_err(query_err)?;

        tx.commit().map_err(query_err)?;
        Ok(changed == 1)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockcastError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(o.date), MAX(o.date), COUNT(*)
                 FROM observations o JOIN symbols s ON s.id = o.symbol_id
                 WHERE s.name = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = parse_date(min_str).map_err(query_err)?;
                let max = parse_date(max_str).map_err(query_err)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl ForecastLedger for SqliteAdapter {
    fn get(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
    ) -> Result<Option<Forecast>, StockcastError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {FORECAST_COLUMNS} {FORECAST_JOINS}
             WHERE s.name = ?1 AND f.date = ?2 AND st.name = ?3"
        );
        conn.query_row(
            &query,
            params![symbol, format_date(date), strategy],
            forecast_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn append(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
        predicted_close: f64,
    ) -> Result<Forecast, StockcastError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let symbol_id = ensure_symbol(&tx, symbol).map_err(query_err)?;
        let strategy_id = ensure_strategy(&tx, strategy).map_err(query_err)?;

        tx.execute(
            "INSERT INTO forecasts (symbol_id, strategy_id, date, predicted_close)
             VALUES (?1, ?2, ?3, ?4)",
            params![symbol_id, strategy_id, format_date(date), predicted_close],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StockcastError::DuplicateForecast {
                    symbol: symbol.to_string(),
                    date,
                    strategy: strategy.to_string(),
                }
            } else {
                query_err(e)
            }
        })?;
        let id = tx.last_insert_rowid();

        tx.commit().map_err(query_err)?;

        Ok(Forecast {
            id,
            symbol: symbol.to_string(),
            date,
            strategy: strategy.to_string(),
            predicted_close,
        })
    }

    fn latest(&self, symbol: &str, strategy: &str) -> Result<Option<Forecast>, StockcastError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {FORECAST_COLUMNS} {FORECAST_JOINS}
             WHERE s.name = ?1 AND st.name = ?2
             ORDER BY f.date DESC
             LIMIT 1"
        );
        conn.query_row(&query, params![symbol, strategy], forecast_from_row)
            .optional()
            .map_err(query_err)
    }

    fn pending(&self, symbol: &str) -> Result<Vec<Forecast>, StockcastError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {FORECAST_COLUMNS} {FORECAST_JOINS}
             LEFT JOIN forecast_results r ON r.forecast_id = f.id
             WHERE s.name = ?1 AND r.id IS NULL
             ORDER BY f.date ASC, st.name ASC"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt
            .query_map(params![symbol], forecast_from_row)
            .map_err(query_err)?;
        collect_rows(rows)
    }

    fn record_result(
        &self,
        forecast_id: i64,
        direction_correct: bool,
        absolute_error: f64,
    ) -> Result<ForecastResult, StockcastError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO forecast_results (forecast_id, direction_correct, absolute_error)
             VALUES (?1, ?2, ?3)",
            params![forecast_id, direction_correct, absolute_error],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StockcastError::DuplicateResult { forecast_id }
            } else {
                query_err(e)
            }
        })?;

        Ok(ForecastResult {
            id: conn.last_insert_rowid(),
            forecast_id,
            direction_correct,
            absolute_error,
        })
    }

    fn scored(&self, symbol: Option<&str>) -> Result<Vec<ScoredForecast>, StockcastError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {FORECAST_COLUMNS}, r.id, r.direction_correct, r.absolute_error
             {FORECAST_JOINS}
             JOIN forecast_results r ON r.forecast_id = f.id
             WHERE ?1 IS NULL OR s.name = ?1
             ORDER BY s.name ASC, f.date ASC, st.name ASC"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                let forecast = forecast_from_row(row)?;
                Ok(ScoredForecast {
                    result: ForecastResult {
                        id: row.get(5)?,
                        forecast_id: forecast.id,
                        direction_correct: row.get(6)?,
                        absolute_error: row.get(7)?,
                    },
                    forecast,
                })
            })
            .map_err(query_err)?;
        collect_rows(rows)
    }

    fn forecast_count(&self, symbol: &str) -> Result<usize, StockcastError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM forecasts f JOIN symbols s ON s.id = f.symbol_id
                 WHERE s.name = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }
}
