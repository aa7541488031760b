//! Forecast ledger records.

use chrono::NaiveDate;

/// A strategy's predicted close for the day after `date`.
///
/// `date` is the baseline day: the forecast is made with history strictly
/// before `date` and is scored against the close on `date + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub id: i64,
    pub symbol: String,
    pub date: NaiveDate,
    pub strategy: String,
    pub predicted_close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub id: i64,
    pub forecast_id: i64,
    pub direction_correct: bool,
    pub absolute_error: f64,
}

/// A forecast joined with its result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredForecast {
    pub forecast: Forecast,
    pub result: ForecastResult,
}
