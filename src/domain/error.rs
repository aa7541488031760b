//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for stockcast.
#[derive(Debug, thiserror::Error)]
pub enum StockcastError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("forecast already recorded for {symbol} on {date} by {strategy}")]
    DuplicateForecast {
        symbol: String,
        date: NaiveDate,
        strategy: String,
    },

    #[error("forecast {forecast_id} has already been scored")]
    DuplicateResult { forecast_id: i64 },

    #[error("insufficient history for {symbol} on {date}: have {have} observations, need {need}")]
    InsufficientHistory {
        symbol: String,
        date: NaiveDate,
        have: usize,
        need: usize,
    },

    #[error("cannot score {symbol} forecast for {date}: no observation on {missing}")]
    MissingBaselineOrOutcome {
        symbol: String,
        date: NaiveDate,
        missing: NaiveDate,
    },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("strategy {name} is already registered")]
    DuplicateStrategy { name: String },

    #[error("strategy {strategy} failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockcastError> for std::process::ExitCode {
    fn from(err: &StockcastError) -> Self {
        let code: u8 = match err {
            StockcastError::Io(_) => 1,
            StockcastError::ConfigParse { .. }
            | StockcastError::ConfigMissing { .. }
            | StockcastError::ConfigInvalid { .. } => 2,
            StockcastError::Database { .. }
            | StockcastError::DatabaseQuery { .. }
            | StockcastError::DuplicateForecast { .. }
            | StockcastError::DuplicateResult { .. } => 3,
            StockcastError::UnknownStrategy { .. }
            | StockcastError::DuplicateStrategy { .. }
            | StockcastError::StrategyFailed { .. } => 4,
            StockcastError::InsufficientHistory { .. }
            | StockcastError::MissingBaselineOrOutcome { .. }
            | StockcastError::MarketData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_forecast_message_names_the_triple() {
        let err = StockcastError::DuplicateForecast {
            symbol: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            strategy: "sma_20".into(),
        };
        assert_eq!(
            err.to_string(),
            "forecast already recorded for AAPL on 2024-03-01 by sma_20"
        );
    }

    #[test]
    fn insufficient_history_message() {
        let err = StockcastError::InsufficientHistory {
            symbol: "MSFT".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            have: 500,
            need: 1000,
        };
        assert!(err.to_string().contains("have 500 observations, need 1000"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StockcastError = io.into();
        assert!(matches!(err, StockcastError::Io(_)));
    }
}
