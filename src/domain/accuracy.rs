//! Per-strategy directional accuracy and mean absolute error.

use crate::domain::forecast::ScoredForecast;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAccuracy {
    pub strategy: String,
    pub scored: usize,
    pub correct: usize,
    /// Percent of correct directions, 2 decimals. `None` without data.
    pub accuracy: Option<f64>,
    pub mean_absolute_error: Option<f64>,
}

impl StrategyAccuracy {
    fn from_totals(strategy: String, totals: Totals) -> Self {
        let (accuracy, mean_absolute_error) = if totals.scored == 0 {
            (None, None)
        } else {
            let n = totals.scored as f64;
            (
                Some(round2(totals.correct as f64 / n * 100.0)),
                Some(totals.error_sum / n),
            )
        };
        Self {
            strategy,
            scored: totals.scored,
            correct: totals.correct,
            accuracy,
            mean_absolute_error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyReport {
    pub rows: Vec<StrategyAccuracy>,
}

#[derive(Default, Clone, Copy)]
struct Totals {
    scored: usize,
    correct: usize,
    error_sum: f64,
}

impl AccuracyReport {
    /// Aggregate scored forecasts by strategy.
    ///
    /// Rows for `strategies` come first in the given order, including those
    /// without scored forecasts; strategies only present in `scored` follow
    /// by name.
    pub fn compute(scored: &[ScoredForecast], strategies: &[String]) -> Self {
        let mut totals: BTreeMap<&str, Totals> = BTreeMap::new();
        for s in scored {
            let t = totals.entry(s.forecast.strategy.as_str()).or_default();
            t.scored += 1;
            if s.result.direction_correct {
                t.correct += 1;
            }
            t.error_sum += s.result.absolute_error;
        }

        let mut rows: Vec<StrategyAccuracy> = strategies
            .iter()
            .map(|name| {
                let t = totals.remove(name.as_str()).unwrap_or_default();
                StrategyAccuracy::from_totals(name.clone(), t)
            })
            .collect();
        rows.extend(
            totals
                .into_iter()
                .map(|(name, t)| StrategyAccuracy::from_totals(name.to_string(), t)),
        );

        Self { rows }
    }

    pub fn get(&self, strategy: &str) -> Option<&StrategyAccuracy> {
        self.rows.iter().find(|r| r.strategy == strategy)
    }

    pub fn total_scored(&self) -> usize {
        self.rows.iter().map(|r| r.scored).sum()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
