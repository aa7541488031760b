//! Observation store port trait.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use chrono::NaiveDate;

/// Append-only, date-ordered history of daily bars per symbol.
pub trait ObservationStore: Send + Sync {
    /// Create the symbol if it does not exist yet.
    fn register_symbol(&self, symbol: &str) -> Result<(), StockcastError>;

    /// All known symbols, sorted by name.
    fn list_symbols(&self) -> Result<Vec<String>, StockcastError>;

    fn latest(&self, symbol: &str) -> Result<Option<Observation>, StockcastError>;

    /// Every observation for `symbol`, ascending by date.
    fn all(&self, symbol: &str) -> Result<Vec<Observation>, StockcastError>;

    /// Store the bar unless one already exists for (symbol, date).
    /// Returns `true` when a row was written.
    fn insert_if_absent(&self, observation: &Observation) -> Result<bool, StockcastError>;

    /// First date, last date and bar count, or `None` without data.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockcastError>;
}
