//! Random walk with drift: last close plus the mean daily change over the
//! trailing window.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::domain::strategies::require_len;
use crate::domain::strategy::ForecastingStrategy;

pub struct Drift {
    name: String,
    window: usize,
}

impl Drift {
    pub fn new(window: usize) -> Self {
        Self {
            name: format!("drift_{window}"),
            window,
        }
    }
}

impl ForecastingStrategy for Drift {
    fn name(&self) -> &str {
        &self.name
    }

    // window changes need window + 1 closes
    fn min_history(&self) -> usize {
        self.window + 1
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        require_len(&self.name, history, self.min_history())?;
        let tail = &history[history.len() - self.window - 1..];
        let first = tail[0].close;
        let last = tail[self.window].close;
        Ok(last + (last - first) / self.window as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategies::test_bars;
    use approx::assert_relative_eq;

    #[test]
    fn linear_series_extrapolates() {
        let bars = test_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        assert_relative_eq!(Drift::new(4).forecast(&bars).unwrap(), 105.0);
    }

    #[test]
    fn uses_only_trailing_window() {
        let bars = test_bars(&[0.0, 50.0, 52.0, 54.0]);
        assert_relative_eq!(Drift::new(2).forecast(&bars).unwrap(), 56.0);
    }

    #[test]
    fn needs_window_plus_one() {
        let bars = test_bars(&[1.0, 2.0, 3.0]);
        assert!(Drift::new(3).forecast(&bars).is_err());
        assert!(Drift::new(2).forecast(&bars).is_ok());
        assert_eq!(Drift::new(250).min_history(), 251);
    }
}
