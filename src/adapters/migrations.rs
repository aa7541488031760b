//! Versioned schema migrations shared by the SQL adapters.
//!
//! Applied migrations are recorded in `schema_migrations`; each adapter
//! applies the ones above the recorded maximum inside one transaction.

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sqlite: &'static str,
    pub postgres: &'static str,
}

pub const SQLITE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

pub const POSTGRES_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "symbols_and_observations",
        sqlite: "CREATE TABLE symbols (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE observations (
                symbol_id INTEGER NOT NULL REFERENCES symbols(id),
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                trade_count INTEGER NOT NULL,
                vwap REAL NOT NULL,
                PRIMARY KEY (symbol_id, date)
            );",
        postgres: "CREATE TABLE symbols (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE observations (
                symbol_id BIGINT NOT NULL REFERENCES symbols(id),
                date DATE NOT NULL,
                open DOUBLE PRECISION NOT NULL,
                high DOUBLE PRECISION NOT NULL,
                low DOUBLE PRECISION NOT NULL,
                close DOUBLE PRECISION NOT NULL,
                volume DOUBLE PRECISION NOT NULL,
                trade_count BIGINT NOT NULL,
                vwap DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (symbol_id, date)
            );",
    },
    Migration {
        version: 2,
        name: "strategies_and_forecasts",
        sqlite: "CREATE TABLE strategies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE forecasts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol_id INTEGER NOT NULL REFERENCES symbols(id),
                strategy_id INTEGER NOT NULL REFERENCES strategies(id),
                date TEXT NOT NULL,
                predicted_close REAL NOT NULL,
                UNIQUE (symbol_id, date, strategy_id)
            );
            CREATE INDEX idx_forecasts_walk ON forecasts(symbol_id, strategy_id, date);",
        postgres: "CREATE TABLE strategies (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE forecasts (
                id BIGSERIAL PRIMARY KEY,
                symbol_id BIGINT NOT NULL REFERENCES symbols(id),
                strategy_id BIGINT NOT NULL REFERENCES strategies(id),
                date DATE NOT NULL,
                predicted_close DOUBLE PRECISION NOT NULL,
                UNIQUE (symbol_id, date, strategy_id)
            );
            CREATE INDEX idx_forecasts_walk ON forecasts(symbol_id, strategy_id, date);",
    },
    Migration {
        version: 3,
        name: "forecast_results",
        sqlite: "CREATE TABLE forecast_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                forecast_id INTEGER NOT NULL UNIQUE REFERENCES forecasts(id),
                direction_correct INTEGER NOT NULL,
                absolute_error REAL NOT NULL
            );",
        postgres: "CREATE TABLE forecast_results (
                id BIGSERIAL PRIMARY KEY,
                forecast_id BIGINT NOT NULL UNIQUE REFERENCES forecasts(id),
                direction_correct BOOLEAN NOT NULL,
                absolute_error DOUBLE PRECISION NOT NULL
            );",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_strictly_increasing() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        assert_eq!(MIGRATIONS[0].version, 1);
    }

    #[test]
    fn forecast_uniqueness_lives_in_both_schemas() {
        let m = MIGRATIONS.iter().find(|m| m.name == "strategies_and_forecasts").unwrap();
        assert!(m.sqlite.contains("UNIQUE (symbol_id, date, strategy_id)"));
        assert!(m.postgres.contains("UNIQUE (symbol_id, date, strategy_id)"));
    }
}
