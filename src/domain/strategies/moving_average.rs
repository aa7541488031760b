//! Moving-average forecasts over the trailing window of closes.
//!
//! SMA(n) = mean of the last n closes.
//! WMA(n) = (1*C[t-n+1] + 2*C[t-n+2] + ... + n*C[t]) / (n*(n+1)/2)

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::domain::strategies::require_len;
use crate::domain::strategy::ForecastingStrategy;

pub struct SimpleMovingAverage {
    name: String,
    window: usize,
}

impl SimpleMovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            name: format!("sma_{window}"),
            window,
        }
    }
}

impl ForecastingStrategy for SimpleMovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        self.window
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        require_len(&self.name, history, self.min_history())?;
        let tail = &history[history.len() - self.window..];
        Ok(tail.iter().map(|o| o.close).sum::<f64>() / self.window as f64)
    }
}

pub struct WeightedMovingAverage {
    name: String,
    window: usize,
}

impl WeightedMovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            name: format!("wma_{window}"),
            window,
        }
    }
}

impl ForecastingStrategy for WeightedMovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_history(&self) -> usize {
        self.window
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        require_len(&self.name, history, self.min_history())?;
        let tail = &history[history.len() - self.window..];
        let divisor = (self.window * (self.window + 1)) as f64 / 2.0;
        let weighted: f64 = tail
            .iter()
            .enumerate()
            .map(|(i, o)| (i + 1) as f64 * o.close)
            .sum();
        Ok(weighted / divisor)
    }
}
