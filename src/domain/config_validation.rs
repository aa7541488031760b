//! Configuration validation.
//!
//! Checks every config field the pipeline reads before any work starts.

use crate::domain::error::StockcastError;
use crate::domain::strategies::parse_kinds;
use crate::ports::config_port::ConfigPort;

pub const BACKENDS: [&str; 2] = ["sqlite", "postgres"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), StockcastError> {
    validate_database(config)?;
    validate_forecast(config)?;
    validate_strategies(config)?;
    validate_market_data(config)?;
    Ok(())
}

pub fn validate_database(config: &dyn ConfigPort) -> Result<(), StockcastError> {
    let backend = config
        .get_string("database", "backend")
        .unwrap_or_else(|| "sqlite".to_string());
    let backend = backend.trim().to_lowercase();
    if !BACKENDS.contains(&backend.as_str()) {
        return Err(StockcastError::ConfigInvalid {
            section: "database".to_string(),
            key: "backend".to_string(),
            reason: format!("unknown backend '{}', expected sqlite or postgres", backend),
        });
    }
    Ok(())
}

pub fn validate_forecast(config: &dyn ConfigPort) -> Result<(), StockcastError> {
    positive_int(config, "forecast", "min_window")
}

pub fn validate_strategies(config: &dyn ConfigPort) -> Result<(), StockcastError> {
    if let Some(enabled) = config.get_string("strategies", "enabled") {
        let kinds = parse_kinds(&enabled).map_err(|e| StockcastError::ConfigInvalid {
            section: "strategies".to_string(),
            key: "enabled".to_string(),
            reason: e.to_string(),
        })?;
        if kinds.is_empty() {
            return Err(StockcastError::ConfigInvalid {
                section: "strategies".to_string(),
                key: "enabled".to_string(),
                reason: "at least one strategy must be enabled".to_string(),
            });
        }
    }
    positive_int(config, "strategies", "sma_window")?;
    positive_int(config, "strategies", "ema_period")?;
    positive_int(config, "strategies", "wma_period")?;
    positive_int(config, "strategies", "drift_window")?;
    Ok(())
}

pub fn validate_market_data(config: &dyn ConfigPort) -> Result<(), StockcastError> {
    positive_int(config, "market_data", "page_size")?;
    positive_int(config, "market_data", "history_years")?;
    Ok(())
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), StockcastError> {
    if config.get_string(section, key).is_some() && config.get_int(section, key, -1) <= 0 {
        return Err(StockcastError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{} must be a positive integer", key),
        });
    }
    Ok(())
}
