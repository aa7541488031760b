//! Exponential moving average forecast.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). The forecast is the final EMA.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::domain::strategies::require_len;
use crate::domain::strategy::ForecastingStrategy;

pub struct ExponentialMovingAverage {
    name: String,
    period: usize,
}

impl ExponentialMovingAverage {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("ema_{period}"),
            period,
        }
    }
}

impl ForecastingStrategy for ExponentialMovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        self.period
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        require_len(&self.name, history, self.min_history())?;

        let k = 2.0 / (self.period as f64 + 1.0);
        let seed = history[..self.period].iter().map(|o| o.close).sum::<f64>()
            / self.period as f64;

        Ok(history[self.period..]
            .iter()
            .fold(seed, |ema, o| o.close * k + ema * (1.0 - k)))
    }
}
