//! Retrospective scoring of stored forecasts against realized closes.
//!
//! A forecast dated D uses the close on D as its baseline and the close on
//! D + 1 as the outcome. Forecasts missing either bar stay pending and are
//! retried on the next pass.

use crate::domain::error::StockcastError;
use crate::domain::forecast::Forecast;
use crate::ports::ledger_port::ForecastLedger;
use crate::ports::observation_port::ObservationStore;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

/// Predicted and realized moves agree in sign. Both sides use strict `>`,
/// so a flat outcome matches a non-rising prediction.
pub fn direction_correct(predicted: f64, baseline: f64, outcome: f64) -> bool {
    (predicted > baseline) == (outcome > baseline)
}

pub fn absolute_error(predicted: f64, outcome: f64) -> f64 {
    (predicted - outcome).abs()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub direction_correct: bool,
    pub absolute_error: f64,
}

/// Score one forecast from a date → close lookup.
pub fn score_forecast(
    forecast: &Forecast,
    closes: &HashMap<NaiveDate, f64>,
) -> Result<Score, StockcastError> {
    let missing = |missing: NaiveDate| StockcastError::MissingBaselineOrOutcome {
        symbol: forecast.symbol.clone(),
        date: forecast.date,
        missing,
    };

    let baseline = *closes.get(&forecast.date).ok_or_else(|| missing(forecast.date))?;
    let outcome_date = forecast.date.succ_opt().ok_or_else(|| missing(forecast.date))?;
    let outcome = *closes.get(&outcome_date).ok_or_else(|| missing(outcome_date))?;

    Ok(Score {
        direction_correct: direction_correct(forecast.predicted_close, baseline, outcome),
        absolute_error: absolute_error(forecast.predicted_close, outcome),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringPass {
    pub symbol: String,
    pub scored: usize,
    pub awaiting: usize,
}

/// Score every pending forecast for `symbol` whose baseline and outcome
/// bars are both stored. Already-scored forecasts are never revisited.
pub fn score_pending(
    store: &dyn ObservationStore,
    ledger: &dyn ForecastLedger,
    symbol: &str,
) -> Result<ScoringPass, StockcastError> {
    let mut pass = ScoringPass {
        symbol: symbol.to_string(),
        ..ScoringPass::default()
    };

    let pending = ledger.pending(symbol)?;
    if pending.is_empty() {
        return Ok(pass);
    }

    let closes: HashMap<NaiveDate, f64> = store
        .all(symbol)?
        .into_iter()
        .map(|o| (o.date, o.close))
        .collect();

    for forecast in &pending {
        let score = match score_forecast(forecast, &closes) {
            Ok(score) => score,
            Err(e @ StockcastError::MissingBaselineOrOutcome { .. }) => {
                debug!("{} ({}): {}", symbol, forecast.strategy, e);
                pass.awaiting += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        match ledger.record_result(forecast.id, score.direction_correct, score.absolute_error) {
            Ok(_) => pass.scored += 1,
            Err(StockcastError::DuplicateResult { forecast_id }) => {
                debug!("forecast {forecast_id} scored concurrently; skipping");
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "{}: scored {} forecasts, {} awaiting outcome",
        symbol, pass.scored, pass.awaiting
    );
    Ok(pass)
}
