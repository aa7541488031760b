//! Forecasting strategies, the registry that names them, and the
//! idempotent ledger-backed `run`.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::ports::ledger_port::ForecastLedger;
use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

/// A named capability: history in, predicted next close out.
///
/// `forecast` is called with every observation strictly before the
/// forecast date, oldest first. Calls must not rely on state left behind
/// by earlier calls.
pub trait ForecastingStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Observations `forecast` needs before it can produce a value.
    fn min_history(&self) -> usize {
        1
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError>;
}

/// Named set of strategies. Identity is by name.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn ForecastingStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn ForecastingStrategy>) -> Result<(), StockcastError> {
        if self.get(strategy.name()).is_some() {
            return Err(StockcastError::DuplicateStrategy {
                name: strategy.name().to_string(),
            });
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ForecastingStrategy>> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ForecastingStrategy>> {
        self.strategies.iter()
    }

    pub fn as_slice(&self) -> &[Arc<dyn ForecastingStrategy>] {
        &self.strategies
    }

    /// Longest history any registered strategy needs; 0 when empty.
    pub fn min_history(&self) -> usize {
        self.strategies
            .iter()
            .map(|s| s.min_history())
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Forecast `date` for `symbol` with `strategy`, at most once.
///
/// An existing ledger row is returned unchanged. Otherwise the strategy is
/// invoked and its value appended; if another writer committed the same
/// triple first, the committed value wins and the local one is discarded.
pub fn run(
    ledger: &dyn ForecastLedger,
    strategy: &dyn ForecastingStrategy,
    symbol: &str,
    date: NaiveDate,
    history: &[Observation],
) -> Result<f64, StockcastError> {
    let name = strategy.name();
    if let Some(existing) = ledger.get(symbol, date, name)? {
        return Ok(existing.predicted_close);
    }

    let value = strategy.forecast(history)?;
    if !value.is_finite() {
        return Err(StockcastError::StrategyFailed {
            strategy: name.to_string(),
            reason: format!("non-finite forecast {value}"),
        });
    }

    match ledger.append(symbol, date, name, value) {
        Ok(forecast) => Ok(forecast.predicted_close),
        Err(StockcastError::DuplicateForecast { .. }) => {
            debug!("{symbol} {date} {name}: lost insert race, adopting committed value");
            ledger
                .get(symbol, date, name)?
                .map(|f| f.predicted_close)
                .ok_or_else(|| StockcastError::DatabaseQuery {
                    reason: format!("forecast for {symbol} {date} {name} vanished after conflict"),
                })
        }
        Err(e) => Err(e),
    }
}

/// Unweighted mean of the strategy outputs; `None` for no outputs.
pub fn ensemble_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
