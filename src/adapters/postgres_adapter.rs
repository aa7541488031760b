//! PostgreSQL observation store and forecast ledger.

use crate::adapters::migrations::{MIGRATIONS, POSTGRES_MIGRATIONS_TABLE};
use crate::domain::error::StockcastError;
use crate::domain::forecast::{Forecast, ForecastResult, ScoredForecast};
use crate::domain::observation::Observation;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::ForecastLedger;
use crate::ports::observation_port::ObservationStore;
use chrono::NaiveDate;
use log::info;
use postgres::error::SqlState;
use postgres::types::ToSql;
use postgres::{GenericClient, NoTls, Row};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<NoTls>;

const OBSERVATION_COLUMNS: &str = "s.name, o.date, o.open, o.high, o.low, o.close, \
                                   o.volume, o.trade_count, o.vwap";

const FORECAST_COLUMNS: &str = "f.id, s.name, f.date, st.name, f.predicted_close";

const FORECAST_JOINS: &str = "FROM forecasts f
                              JOIN symbols s ON s.id = f.symbol_id
                              JOIN strategies st ON st.id = f.strategy_id";

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn query_err(e: postgres::Error) -> StockcastError {
    StockcastError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn is_unique_violation(e: &postgres::Error) -> bool {
    e.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

fn observation_from_row(row: &Row) -> Observation {
    Observation {
        symbol: row.get(0),
        date: row.get(1),
        open: row.get(2),
        high: row.get(3),
        low: row.get(4),
        close: row.get(5),
        volume: row.get(6),
        trade_count: row.get(7),
        vwap: row.get(8),
    }
}

fn forecast_from_row(row: &Row) -> Forecast {
    Forecast {
        id: row.get(0),
        symbol: row.get(1),
        date: row.get(2),
        strategy: row.get(3),
        predicted_close: row.get(4),
    }
}

fn ensure_symbol(client: &mut impl GenericClient, symbol: &str) -> Result<i64, postgres::Error> {
    client.execute(
        "INSERT INTO symbols (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        &[&symbol],
    )?;
    let row = client.query_one("SELECT id FROM symbols WHERE name = $1", &[&symbol])?;
    Ok(row.get(0))
}

fn ensure_strategy(
    client: &mut impl GenericClient,
    strategy: &str,
) -> Result<i64, postgres::Error> {
    client.execute(
        "INSERT INTO strategies (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        &[&strategy],
    )?;
    let row = client.query_one("SELECT id FROM strategies WHERE name = $1", &[&strategy])?;
    Ok(row.get(0))
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockcastError> {
        // [postgres] connection_string first, then [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| StockcastError::ConfigMissing {
                section: "database".into(),
                key: "conninfo".into(),
            })?;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| StockcastError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e| StockcastError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, StockcastError> {
        self.pool.get().map_err(|e| StockcastError::Database {
            reason: e.to_string(),
        })
    }

    /// Apply pending migrations. Returns how many were applied.
    pub fn initialize_schema(&self) -> Result<usize, StockcastError> {
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;

        tx.batch_execute(POSTGRES_MIGRATIONS_TABLE)
            .map_err(query_err)?;
        // Serializes concurrent migrators until commit.
        tx.batch_execute("LOCK TABLE schema_migrations IN EXCLUSIVE MODE")
            .map_err(query_err)?;
        let current: i64 = tx
            .query_one("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", &[])
            .map_err(query_err)?
            .get(0);

        let mut applied = 0;
        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            tx.batch_execute(migration.postgres).map_err(query_err)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, name) VALUES ($1, $2)",
                &[&migration.version, &migration.name],
            )
            .map_err(query_err)?;
            info!("Applied migration {} ({})", migration.version, migration.name);
            applied += 1;
        }

        tx.commit().map_err(query_err)?;
        Ok(applied)
    }

    pub fn schema_version(&self) -> Result<i64, StockcastError> {
        let mut client = self.conn()?;
        let row = client
            .query_one("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", &[])
            .map_err(query_err)?;
        Ok(row.get(0))
    }

    fn query_forecasts(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Forecast>, StockcastError> {
        let mut client = self.conn()?;
        let rows = client.query(query, params).map_err(query_err)?;
        Ok(rows.iter().map(forecast_from_row).collect())
    }
}

impl ObservationStore for PostgresAdapter {
    fn register_symbol(&self, symbol: &str) -> Result<(), StockcastError> {
        let mut client = self.conn()?;
        ensure_symbol(&mut *client, symbol).map_err(query_err)?;
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockcastError> {
        let mut client = self.conn()?;
        let rows = client
            .query("SELECT name FROM symbols ORDER BY name", &[])
            .map_err(query_err)?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn latest(&self, symbol: &str) -> Result<Option<Observation>, StockcastError> {
        let mut client = self.conn()?;
        let query = format!(
            "SELECT {OBSERVATION_COLUMNS}
             FROM observations o JOIN symbols s ON s.id = o.symbol_id
             WHERE s.name = $1
             ORDER BY o.date DESC
             LIMIT 1"
        );
        let row = client.query_opt(&query, &[&symbol]).map_err(query_err)?;
        Ok(row.as_ref().map(observation_from_row))
    }

    fn all(&self, symbol: &str) -> Result<Vec<Observation>, StockcastError> {
        let mut client = self.conn()?;
        let query = format!(
            "SELECT {OBSERVATION_COLUMNS}
             FROM observations o JOIN symbols s ON s.id = o.symbol_id
             WHERE s.name = $1
             ORDER BY o.date ASC"
        );
        let rows = client.query(&query, &[&symbol]).map_err(query_err)?;
        Ok(rows.iter().map(observation_from_row).collect())
    }

    fn insert_if_absent(&self, observation: &Observation) -> Result<bool, StockcastError> {
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;

        let symbol_id = ensure_symbol(&mut tx, &observation.symbol).map_err(query_err)?;
        let changed = tx
            .execute(
                "INSERT INTO observations
                     (symbol_id, date, open, high, low, close, volume, trade_count, vwap)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (symbol_id, date) DO NOTHING",
                &[
                    &symbol_id,
                    &observation.date,
                    &observation.open,
                    &observation.high,
                    &observation.low,
                    &observation.close,
                    &observation.volume,
                    &observation.trade_count,
                    &observation.vwap,
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
        let mut client = self.conn()?;
        let row = client
            .query_one(
                "SELECT MIN(o.date), MAX(o.date), COUNT(*)
                 FROM observations o JOIN symbols s ON s.id = o.symbol_id
                 WHERE s.name = $1",
                &[&symbol],
            )
            .map_err(query_err)?;

        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}

impl ForecastLedger for PostgresAdapter {
    fn get(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
    ) -> Result<Option<Forecast>, StockcastError> {
        let query = format!(
            "SELECT {FORECAST_COLUMNS} {FORECAST_JOINS}
             WHERE s.name = $1 AND f.date = $2 AND st.name = $3"
        );
        Ok(self
            .query_forecasts(&query, &[&symbol, &date, &strategy])?
            .into_iter()
            .next())
    }

    fn append(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
        predicted_close: f64,
    ) -> Result<Forecast, StockcastError> {
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;

        let symbol_id = ensure_symbol(&mut tx, symbol).map_err(query_err)?;
        let strategy_id = ensure_strategy(&mut tx, strategy).map_err(query_err)?;

        let row = tx
            .query_one(
                "INSERT INTO forecasts (symbol_id, strategy_id, date, predicted_close)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
                &[&symbol_id, &strategy_id, &date, &predicted_close],
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

        tx.commit().map_err(query_err)?;

        Ok(Forecast {
            id: row.get(0),
            symbol: symbol.to_string(),
            date,
            strategy: strategy.to_string(),
            predicted_close,
        })
    }

    fn latest(&self, symbol: &str, strategy: &str) -> Result<Option<Forecast>, StockcastError> {
        let query = format!(
            "SELECT {FORECAST_COLUMNS} {FORECAST_JOINS}
             WHERE s.name = $1 AND st.name = $2
             ORDER BY f.date DESC
             LIMIT 1"
        );
        Ok(self
            .query_forecasts(&query, &[&symbol, &strategy])?
            .into_iter()
            .next())
    }

    fn pending(&self, symbol: &str) -> Result<Vec<Forecast>, StockcastError> {
        let query = format!(
            "SELECT {FORECAST_COLUMNS} {FORECAST_JOINS}
             LEFT JOIN forecast_results r ON r.forecast_id = f.id
             WHERE s.name = $1 AND r.id IS NULL
             ORDER BY f.date ASC, st.name ASC"
        );
        self.query_forecasts(&query, &[&symbol])
    }

    fn record_result(
        &self,
        forecast_id: i64,
        direction_correct: bool,
        absolute_error: f64,
    ) -> Result<ForecastResult, StockcastError> {
        let mut client = self.conn()?;
        let row = client
            .query_one(
                "INSERT INTO forecast_results (forecast_id, direction_correct, absolute_error)
                 VALUES ($1, $2, $3)
                 RETURNING id",
                &[&forecast_id, &direction_correct, &absolute_error],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StockcastError::DuplicateResult { forecast_id }
                } else {
                    query_err(e)
                }
            })?;

        Ok(ForecastResult {
            id: row.get(0),
            forecast_id,
            direction_correct,
            absolute_error,
        })
    }

    fn scored(&self, symbol: Option<&str>) -> Result<Vec<ScoredForecast>, StockcastError> {
        let mut client = self.conn()?;
        let query = format!(
            "SELECT {FORECAST_COLUMNS}, r.id, r.direction_correct, r.absolute_error
             {FORECAST_JOINS}
             JOIN forecast_results r ON r.forecast_id = f.id
             WHERE $1::TEXT IS NULL OR s.name = $1
             ORDER BY s.name ASC, f.date ASC, st.name ASC"
        );
        let rows = client.query(&query, &[&symbol]).map_err(query_err)?;

        Ok(rows
            .iter()
            .map(|row| {
                let forecast = forecast_from_row(row);
                ScoredForecast {
                    result: ForecastResult {
                        id: row.get(5),
                        forecast_id: forecast.id,
                        direction_correct: row.get(6),
                        absolute_error: row.get(7),
                    },
                    forecast,
                }
            })
            .collect())
    }

    fn forecast_count(&self, symbol: &str) -> Result<usize, StockcastError> {
        let mut client = self.conn()?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM forecasts f JOIN symbols s ON s.id = f.symbol_id
                 WHERE s.name = $1",
                &[&symbol],
            )
            .map_err(query_err)?;
        let count: i64 = row.get(0);
        Ok(count as usize)
    }
}
