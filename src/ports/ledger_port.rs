//! Forecast ledger port trait.

use crate::domain::error::StockcastError;
use crate::domain::forecast::{Forecast, ForecastResult, ScoredForecast};
use chrono::NaiveDate;

/// Durable record of every forecast ever produced.
///
/// Implementations must enforce uniqueness of (symbol, date, strategy) and
/// of one result per forecast at the storage layer, and make each write
/// all-or-nothing.
pub trait ForecastLedger: Send + Sync {
    fn get(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
    ) -> Result<Option<Forecast>, StockcastError>;

    fn exists(&self, symbol: &str, date: NaiveDate, strategy: &str) -> Result<bool, StockcastError> {
        Ok(self.get(symbol, date, strategy)?.is_some())
    }

    /// Fails with `DuplicateForecast` if the triple is already recorded.
    fn append(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
        predicted_close: f64,
    ) -> Result<Forecast, StockcastError>;

    /// Most recent forecast by date for the (symbol, strategy) pair.
    fn latest(&self, symbol: &str, strategy: &str) -> Result<Option<Forecast>, StockcastError>;

    /// Forecasts for `symbol` that have no result yet, ascending by date.
    fn pending(&self, symbol: &str) -> Result<Vec<Forecast>, StockcastError>;

    /// Fails with `DuplicateResult` if the forecast is already scored.
    fn record_result(
        &self,
        forecast_id: i64,
        direction_correct: bool,
        absolute_error: f64,
    ) -> Result<ForecastResult, StockcastError>;

    /// Scored forecasts, for one symbol or for all symbols.
    fn scored(&self, symbol: Option<&str>) -> Result<Vec<ScoredForecast>, StockcastError>;

    fn forecast_count(&self, symbol: &str) -> Result<usize, StockcastError>;
}
