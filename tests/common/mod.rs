#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use stockcast::domain::error::StockcastError;
use stockcast::domain::forecast::{Forecast, ForecastResult, ScoredForecast};
pub use stockcast::domain::observation::Observation;
use stockcast::domain::strategy::ForecastingStrategy;
use stockcast::ports::ledger_port::ForecastLedger;
use stockcast::ports::market_data_port::{BarPage, MarketDataPort};
use stockcast::ports::observation_port::ObservationStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: NaiveDate, close: f64) -> Observation {
    Observation {
        symbol: symbol.to_string(),
        date,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
        trade_count: 10,
        vwap: close,
    }
}

/// `count` bars on consecutive calendar days from `start`, close = 100 + i.
pub fn generate_bars(symbol: &str, start: NaiveDate, count: usize) -> Vec<Observation> {
    (0..count)
        .map(|i| make_bar(symbol, start + Days::new(i as u64), 100.0 + i as f64))
        .collect()
}

/// `count` bars on weekdays only, starting at the first weekday on or after
/// `start`.
pub fn generate_weekday_bars(symbol: &str, start: NaiveDate, count: usize) -> Vec<Observation> {
    use chrono::{Datelike, Weekday};
    let mut bars = Vec::with_capacity(count);
    let mut day = start;
    while bars.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            bars.push(make_bar(symbol, day, 100.0 + bars.len() as f64));
        }
        day = day.succ_opt().unwrap();
    }
    bars
}

#[derive(Default)]
pub struct MockStore {
    symbols: Mutex<BTreeSet<String>>,
    bars: Mutex<HashMap<String, BTreeMap<NaiveDate, Observation>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(self, bars: Vec<Observation>) -> Self {
        for bar in bars {
            self.insert_if_absent(&bar).unwrap();
        }
        self
    }
}

impl ObservationStore for MockStore {
    fn register_symbol(&self, symbol: &str) -> Result<(), StockcastError> {
        self.symbols.lock().unwrap().insert(symbol.to_string());
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockcastError> {
        Ok(self.symbols.lock().unwrap().iter().cloned().collect())
    }

    fn latest(&self, symbol: &str) -> Result<Option<Observation>, StockcastError> {
        Ok(self
            .bars
            .lock()
            .unwrap()
            .get(symbol)
            .and_then(|m| m.values().next_back().cloned()))
    }

    fn all(&self, symbol: &str) -> Result<Vec<Observation>, StockcastError> {
        Ok(self
            .bars
            .lock()
            .unwrap()
            .get(symbol)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    fn insert_if_absent(&self, observation: &Observation) -> Result<bool, StockcastError> {
        self.register_symbol(&observation.symbol)?;
        let mut bars = self.bars.lock().unwrap();
        let series = bars.entry(observation.symbol.clone()).or_default();
        if series.contains_key(&observation.date) {
            return Ok(false);
        }
        series.insert(observation.date, observation.clone());
        Ok(true)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockcastError> {
        let bars = self.bars.lock().unwrap();
        Ok(bars.get(symbol).and_then(|m| {
            let first = *m.keys().next()?;
            let last = *m.keys().next_back()?;
            Some((first, last, m.len()))
        }))
    }
}

#[derive(Default)]
pub struct MockLedger {
    forecasts: Mutex<Vec<Forecast>>,
    results: Mutex<Vec<ForecastResult>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forecasts(&self) -> Vec<Forecast> {
        self.forecasts.lock().unwrap().clone()
    }

    pub fn result_count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn dates_for(&self, symbol: &str, strategy: &str) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = self
            .forecasts
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.symbol == symbol && f.strategy == strategy)
            .map(|f| f.date)
            .collect();
        dates.sort();
        dates
    }
}

impl ForecastLedger for MockLedger {
    fn get(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
    ) -> Result<Option<Forecast>, StockcastError> {
        Ok(self
            .forecasts
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.symbol == symbol && f.date == date && f.strategy == strategy)
            .cloned())
    }

    fn append(
        &self,
        symbol: &str,
        date: NaiveDate,
        strategy: &str,
        predicted_close: f64,
    ) -> Result<Forecast, StockcastError> {
        let mut forecasts = self.forecasts.lock().unwrap();
        if forecasts
            .iter()
            .any(|f| f.symbol == symbol && f.date == date && f.strategy == strategy)
        {
            return Err(StockcastError::DuplicateForecast {
                symbol: symbol.to_string(),
                date,
                strategy: strategy.to_string(),
            });
        }
        let forecast = Forecast {
            id: forecasts.len() as i64 + 1,
            symbol: symbol.to_string(),
            date,
            strategy: strategy.to_string(),
            predicted_close,
        };
        forecasts.push(forecast.clone());
        Ok(forecast)
    }

    fn latest(&self, symbol: &str, strategy: &str) -> Result<Option<Forecast>, StockcastError> {
        Ok(self
            .forecasts
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.symbol == symbol && f.strategy == strategy)
            .max_by_key(|f| f.date)
            .cloned())
    }

    fn pending(&self, symbol: &str) -> Result<Vec<Forecast>, StockcastError> {
        let forecasts = self.forecasts.lock().unwrap();
        let results = self.results.lock().unwrap();
        let mut pending: Vec<Forecast> = forecasts
            .iter()
            .filter(|f| f.symbol == symbol && !results.iter().any(|r| r.forecast_id == f.id))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.strategy.cmp(&b.strategy)));
        Ok(pending)
    }

    fn record_result(
        &self,
        forecast_id: i64,
        direction_correct: bool,
        absolute_error: f64,
    ) -> Result<ForecastResult, StockcastError> {
        let mut results = self.results.lock().unwrap();
        if results.iter().any(|r| r.forecast_id == forecast_id) {
            return Err(StockcastError::DuplicateResult { forecast_id });
        }
        let result = ForecastResult {
            id: results.len() as i64 + 1,
            forecast_id,
            direction_correct,
            absolute_error,
        };
        results.push(result.clone());
        Ok(result)
    }

    fn scored(&self, symbol: Option<&str>) -> Result<Vec<ScoredForecast>, StockcastError> {
        let forecasts = self.forecasts.lock().unwrap();
        let results = self.results.lock().unwrap();
        Ok(results
            .iter()
            .filter_map(|r| {
                let forecast = forecasts.iter().find(|f| f.id == r.forecast_id)?;
                if symbol.is_some_and(|s| s != forecast.symbol) {
                    return None;
                }
                Some(ScoredForecast {
                    forecast: forecast.clone(),
                    result: r.clone(),
                })
            })
            .collect())
    }

    fn forecast_count(&self, symbol: &str) -> Result<usize, StockcastError> {
        Ok(self
            .forecasts
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.symbol == symbol)
            .count())
    }
}

pub struct MockMarketData {
    pub bars: HashMap<String, Vec<Observation>>,
    pub errors: HashMap<String, String>,
    pub page_size: usize,
    /// Hand back the same token forever.
    pub stuck_token: bool,
    pub calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            errors: HashMap::new(),
            page_size: usize::MAX,
            stuck_token: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Observation>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_stuck_token(mut self) -> Self {
        self.stuck_token = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<BarPage, StockcastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StockcastError::MarketData {
                reason: reason.clone(),
            });
        }
        if self.stuck_token {
            return Ok(BarPage {
                bars: Vec::new(),
                next_page_token: Some("again".to_string()),
            });
        }

        let in_range: Vec<Observation> = self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= from && b.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = offset.saturating_add(self.page_size).min(in_range.len());
        Ok(BarPage {
            bars: in_range[offset.min(end)..end].to_vec(),
            next_page_token: (end < in_range.len()).then(|| end.to_string()),
        })
    }
}

/// Predicts the last close plus `step`, counting invocations.
pub struct CountingStrategy {
    pub name: String,
    pub step: f64,
    pub calls: AtomicUsize,
}

impl CountingStrategy {
    pub fn new(name: &str, step: f64) -> Self {
        Self {
            name: name.to_string(),
            step,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ForecastingStrategy for CountingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        history
            .last()
            .map(|o| o.close + self.step)
            .ok_or_else(|| StockcastError::StrategyFailed {
                strategy: self.name.clone(),
                reason: "empty history".into(),
            })
    }
}

/// Records the newest date and length of every history it is handed.
#[derive(Default)]
pub struct RecordingStrategy {
    pub seen: Mutex<Vec<(NaiveDate, usize)>>,
}

impl ForecastingStrategy for RecordingStrategy {
    fn name(&self) -> &str {
        "recording"
    }

    fn forecast(&self, history: &[Observation]) -> Result<f64, StockcastError> {
        let last = history.last().ok_or_else(|| StockcastError::StrategyFailed {
            strategy: "recording".into(),
            reason: "empty history".into(),
        })?;
        self.seen.lock().unwrap().push((last.date, history.len()));
        Ok(last.close)
    }
}

/// Always fails.
pub struct FailingStrategy;

impl ForecastingStrategy for FailingStrategy {
    fn name(&self) -> &str {
        "failing"
    }

    fn forecast(&self, _history: &[Observation]) -> Result<f64, StockcastError> {
        Err(StockcastError::StrategyFailed {
            strategy: "failing".into(),
            reason: "model unavailable".into(),
        })
    }
}
