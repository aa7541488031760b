//! Persistence forecast: tomorrow closes where today closed.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::domain::strategy::ForecastingStrategy;

pub struct LastClose;

impl ForecastingStrategy for LastClose {
    fn name(&self) -> &str {
        "last_close"
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        history
            .last()
            .map(|o| o.close)
            .ok_or_else(|| StockcastError::StrategyFailed {
                strategy: self.name().to_string(),
                reason: "empty history".into(),
            })
    }
}
