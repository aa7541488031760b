//! Built-in baseline strategies.
//!
//! Each kind is configured by a window or period and registers under a
//! name that carries it (`sma_20`, `ema_10`, ...), so changing a parameter
//! starts a fresh walk in the ledger instead of mixing forecasts.

pub mod drift;
pub mod ema;
pub mod last_close;
pub mod moving_average;

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::domain::strategy::StrategyRegistry;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    LastClose,
    Sma,
    Ema,
    Wma,
    Drift,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::LastClose,
        StrategyKind::Sma,
        StrategyKind::Ema,
        StrategyKind::Wma,
        StrategyKind::Drift,
    ];
}

impl FromStr for StrategyKind {
    type Err = StockcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last_close" => Ok(StrategyKind::LastClose),
            "sma" => Ok(StrategyKind::Sma),
            "ema" => Ok(StrategyKind::Ema),
            "wma" => Ok(StrategyKind::Wma),
            "drift" => Ok(StrategyKind::Drift),
            other => Err(StockcastError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::LastClose => "last_close",
            StrategyKind::Sma => "sma",
            StrategyKind::Ema => "ema",
            StrategyKind::Wma => "wma",
            StrategyKind::Drift => "drift",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub enabled: Vec<StrategyKind>,
    pub sma_window: usize,
    pub ema_period: usize,
    pub wma_period: usize,
    pub drift_window: usize,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            enabled: StrategyKind::ALL.to_vec(),
            sma_window: 20,
            ema_period: 10,
            wma_period: 10,
            drift_window: 250,
        }
    }
}

/// Parse a comma-separated list of strategy kinds.
pub fn parse_kinds(input: &str) -> Result<Vec<StrategyKind>, StockcastError> {
    let mut kinds = Vec::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let kind: StrategyKind = token.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

pub fn build_registry(settings: &StrategySettings) -> Result<StrategyRegistry, StockcastError> {
    let mut registry = StrategyRegistry::new();
    for kind in &settings.enabled {
        match kind {
            StrategyKind::LastClose => registry.register(Arc::new(last_close::LastClose))?,
            StrategyKind::Sma => registry.register(Arc::new(
                moving_average::SimpleMovingAverage::new(settings.sma_window),
            ))?,
            StrategyKind::Ema => {
                registry.register(Arc::new(ema::ExponentialMovingAverage::new(settings.ema_period)))?
            }
            StrategyKind::Wma => registry.register(Arc::new(
                moving_average::WeightedMovingAverage::new(settings.wma_period),
            ))?,
            StrategyKind::Drift => {
                registry.register(Arc::new(drift::Drift::new(settings.drift_window)))?
            }
        }
    }
    Ok(registry)
}

pub(crate) fn require_len(
    strategy: &str,
    history: &[Observation],
    needed: usize,
) -> Result<(), StockcastError> {
    if needed == 0 || history.len() < needed {
        return Err(StockcastError::StrategyFailed {
            strategy: strategy.to_string(),
            reason: format!("needs {} closes, history has {}", needed, history.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_bars(closes: &[f64]) -> Vec<Observation> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Observation {
            symbol: "TEST".into(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
            trade_count: 1,
            vwap: close,
        })
        .collect()
}
