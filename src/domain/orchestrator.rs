//! Walk-forward forecast orchestration.
//!
//! One pass per symbol: find the dates each strategy still lacks, feed every
//! strategy the history strictly before each date, record the forecasts in
//! the ledger, then score whatever forecasts have realized outcomes.

use crate::domain::accuracy::AccuracyReport;
use crate::domain::error::StockcastError;
use crate::domain::ingest;
use crate::domain::observation::{Observation, history_before};
use crate::domain::schedule::ForecastSchedule;
use crate::domain::scorer::{self, ScoringPass};
use crate::domain::strategy::{self, ForecastingStrategy, StrategyRegistry, ensemble_mean};
use crate::ports::ledger_port::ForecastLedger;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::observation_port::ObservationStore;
use chrono::NaiveDate;
use log::{debug, error, info};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const DEFAULT_MIN_WINDOW: usize = 1000;
pub const DEFAULT_HISTORY_YEARS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastConfig {
    /// Observations required strictly before a date to forecast it.
    pub min_window: usize,
    /// How far back to fetch for a symbol without observations.
    pub history_years: u32,
    /// Evaluate the strategies of one date on the rayon pool.
    pub parallel: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_window: DEFAULT_MIN_WINDOW,
            history_years: DEFAULT_HISTORY_YEARS,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyForecast {
    pub strategy: String,
    pub predicted_close: f64,
}

/// Every registered strategy's forecast for one date, plus their mean.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Close of the last observation the strategies saw.
    pub last_close: f64,
    pub forecasts: Vec<StrategyForecast>,
    /// Presentational only; never written to the ledger.
    pub combined: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastPass {
    pub symbol: String,
    pub days: Vec<DailyForecast>,
    /// Dates left pending for lack of history.
    pub skipped: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRun {
    pub symbol: String,
    pub fetched: usize,
    pub forecasts: ForecastPass,
    pub scoring: ScoringPass,
    pub accuracy: AccuracyReport,
}

#[derive(Debug)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<SymbolRun, StockcastError>,
}

/// The history a strategy may see for `date`, or `InsufficientHistory`.
pub fn eligible_history<'a>(
    observations: &'a [Observation],
    symbol: &str,
    date: NaiveDate,
    min_window: usize,
) -> Result<&'a [Observation], StockcastError> {
    let history = history_before(observations, date);
    if history.len() < min_window {
        return Err(StockcastError::InsufficientHistory {
            symbol: symbol.to_string(),
            date,
            have: history.len(),
            need: min_window,
        });
    }
    Ok(history)
}

pub struct Orchestrator<'a> {
    store: &'a dyn ObservationStore,
    ledger: &'a dyn ForecastLedger,
    registry: &'a StrategyRegistry,
    config: ForecastConfig,
    market_data: Option<&'a dyn MarketDataPort>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn ObservationStore,
        ledger: &'a dyn ForecastLedger,
        registry: &'a StrategyRegistry,
        config: ForecastConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            registry,
            config,
            market_data: None,
        }
    }

    pub fn with_market_data(mut self, provider: &'a dyn MarketDataPort) -> Self {
        self.market_data = Some(provider);
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Observations required before a date: `min_window`, raised to what the
    /// hungriest registered strategy needs.
    pub fn required_history(&self) -> usize {
        self.config.min_window.max(self.registry.min_history())
    }

    /// Union of every strategy's walk for `symbol`, ascending.
    pub fn pending_dates(
        &self,
        symbol: &str,
        observations: &[Observation],
    ) -> Result<BTreeSet<NaiveDate>, StockcastError> {
        let (first, latest) = match (observations.first(), observations.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => return Ok(BTreeSet::new()),
        };

        let mut dates = BTreeSet::new();
        for s in self.registry.iter() {
            let schedule =
                ForecastSchedule::for_strategy(self.ledger, symbol, s.name(), first, latest)?;
            dates.extend(schedule);
        }
        Ok(dates)
    }

    /// Run every registered strategy for one date, on the rayon pool when
    /// `config.parallel` is set. Output keeps registry order.
    ///
    /// Strategies that already have a ledger row for the date return it
    /// without being invoked.
    pub fn forecast_date(
        &self,
        symbol: &str,
        date: NaiveDate,
        history: &[Observation],
    ) -> Result<DailyForecast, StockcastError> {
        let ledger = self.ledger;
        let run_one = |s: &Arc<dyn ForecastingStrategy>| {
            strategy::run(ledger, s.as_ref(), symbol, date, history).map(|predicted_close| {
                StrategyForecast {
                    strategy: s.name().to_string(),
                    predicted_close,
                }
            })
        };
        let strategies = self.registry.as_slice();
        let forecasts: Vec<StrategyForecast> = if self.config.parallel {
            strategies.par_iter().map(run_one).collect::<Result<_, _>>()?
        } else {
            strategies.iter().map(run_one).collect::<Result<_, _>>()?
        };

        let values: Vec<f64> = forecasts.iter().map(|f| f.predicted_close).collect();
        Ok(DailyForecast {
            date,
            last_close: history.last().map(|o| o.close).unwrap_or_default(),
            combined: ensemble_mean(&values),
            forecasts,
        })
    }

    /// Fill every missing forecast date for `symbol`.
    pub fn forecast_symbol(&self, symbol: &str) -> Result<ForecastPass, StockcastError> {
        let mut pass = ForecastPass {
            symbol: symbol.to_string(),
            ..ForecastPass::default()
        };

        if self.registry.is_empty() {
            return Ok(pass);
        }

        let observations = self.store.all(symbol)?;
        if observations.is_empty() {
            debug!("{symbol}: no observations, nothing to forecast");
            return Ok(pass);
        }

        let required = self.required_history();
        if required > self.config.min_window {
            debug!(
                "{symbol}: strategies need {required} observations, above min_window {}",
                self.config.min_window
            );
        }

        let dates = self.pending_dates(symbol, &observations)?;
        info!(
            "Forecasting {}: {} candidate dates, {} strategies",
            symbol,
            dates.len(),
            self.registry.len()
        );

        for date in dates {
            let history =
                match eligible_history(&observations, symbol, date, required) {
                    Ok(h) => h,
                    Err(StockcastError::InsufficientHistory { have, need, .. }) => {
                        debug!("{symbol} {date}: {have} of {need} observations, skipping");
                        pass.skipped.push(date);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
            pass.days.push(self.forecast_date(symbol, date, history)?);
        }

        info!(
            "{}: forecast {} dates, {} left pending for history",
            symbol,
            pass.days.len(),
            pass.skipped.len()
        );
        Ok(pass)
    }

    pub fn score_symbol(&self, symbol: &str) -> Result<ScoringPass, StockcastError> {
        scorer::score_pending(self.store, self.ledger, symbol)
    }

    /// Accuracy over scored forecasts for one symbol, or all of them.
    pub fn accuracy(&self, symbol: Option<&str>) -> Result<AccuracyReport, StockcastError> {
        let scored = self.ledger.scored(symbol)?;
        Ok(AccuracyReport::compute(&scored, &self.registry.names()))
    }

    /// fetch → forecast → score → report for one symbol.
    pub fn run_symbol(&self, symbol: &str, as_of: NaiveDate) -> Result<SymbolRun, StockcastError> {
        let fetched = match self.market_data {
            Some(provider) => ingest::sync_observations(
                provider,
                self.store,
                symbol,
                as_of,
                self.config.history_years,
            )?,
            None => 0,
        };

        let forecasts = self.forecast_symbol(symbol)?;
        let scoring = self.score_symbol(symbol)?;
        let accuracy = self.accuracy(Some(symbol))?;

        Ok(SymbolRun {
            symbol: symbol.to_string(),
            fetched,
            forecasts,
            scoring,
            accuracy,
        })
    }

    /// Run each symbol in turn. A failing symbol is logged and reported in
    /// its outcome; the remaining symbols still run.
    pub fn run_all(&self, symbols: &[String], as_of: NaiveDate) -> Vec<SymbolOutcome> {
        symbols
            .iter()
            .map(|symbol| {
                let result = self.run_symbol(symbol, as_of);
                if let Err(e) = &result {
                    error!("{symbol}: {e}");
                }
                SymbolOutcome {
                    symbol: symbol.clone(),
                    result,
                }
            })
            .collect()
    }
}
