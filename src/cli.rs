//! CLI definition and dispatch.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvMarketDataAdapter, DEFAULT_PAGE_SIZE};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::StockcastError;
use crate::domain::ingest::sync_observations;
use crate::domain::orchestrator::{
    DEFAULT_HISTORY_YEARS, DEFAULT_MIN_WINDOW, ForecastConfig, Orchestrator,
};
use crate::domain::strategies::{StrategySettings, build_registry, parse_kinds};
use crate::domain::strategy::StrategyRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::ForecastLedger;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::observation_port::ObservationStore;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "stockcast", about = "Walk-forward daily close forecasting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending schema migrations
    Migrate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register a symbol to track
    AddSymbol {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: String,
    },
    /// Fetch missing daily bars from the market data provider
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: Option<String>,
        /// Last day to fetch (defaults to today, UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Forecast every date still missing from the ledger
    Forecast {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: Option<String>,
    },
    /// Score forecasts whose outcome is known
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: Option<String>,
    },
    /// Show per-strategy accuracy and mean absolute error
    Report {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: Option<String>,
    },
    /// Fetch, forecast, score and report every symbol
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: Option<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Show stored observations and forecasts per symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_symbol)]
        symbol: Option<String>,
    },
    /// List the strategies the configuration registers
    Strategies {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Trimmed, upper-cased ticker; blank input is rejected at parse time.
fn parse_symbol(value: &str) -> Result<String, String> {
    let symbol = value.trim().to_uppercase();
    if symbol.is_empty() {
        return Err("symbol must not be empty".to_string());
    }
    Ok(symbol)
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Migrate { config } => run_migrate(&config),
        Command::AddSymbol { config, symbol } => run_add_symbol(&config, &symbol),
        Command::Fetch {
            config,
            symbol,
            as_of,
        } => run_fetch(&config, symbol.as_deref(), as_of),
        Command::Forecast { config, symbol } => run_forecast(&config, symbol.as_deref()),
        Command::Score { config, symbol } => run_score(&config, symbol.as_deref()),
        Command::Report { config, symbol } => run_report(&config, symbol.as_deref()),
        Command::Run {
            config,
            symbol,
            as_of,
        } => run_pipeline(&config, symbol.as_deref(), as_of),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::Strategies { config } => run_strategies(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StockcastError> {
    let config =
        FileConfigAdapter::from_file(path).map_err(|e| StockcastError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// The configured storage backend. Both adapters serve observations and the
/// forecast ledger from one pool.
pub enum Backend {
    #[cfg(feature = "sqlite")]
    Sqlite(crate::adapters::sqlite_adapter::SqliteAdapter),
    #[cfg(feature = "postgres")]
    Postgres(crate::adapters::postgres_adapter::PostgresAdapter),
}

impl Backend {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockcastError> {
        let name = config
            .get_string("database", "backend")
            .unwrap_or_else(|| "sqlite".to_string())
            .trim()
            .to_lowercase();

        match name.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(Backend::Sqlite(
                crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?,
            )),
            #[cfg(feature = "postgres")]
            "postgres" => Ok(Backend::Postgres(
                crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?,
            )),
            other => Err(StockcastError::ConfigInvalid {
                section: "database".into(),
                key: "backend".into(),
                reason: format!("backend '{}' is not available in this build", other),
            }),
        }
    }

    /// Apply pending migrations; returns how many ran.
    pub fn migrate(&self) -> Result<usize, StockcastError> {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(a) => a.initialize_schema(),
            #[cfg(feature = "postgres")]
            Backend::Postgres(a) => a.initialize_schema(),
        }
    }

    pub fn schema_version(&self) -> Result<i64, StockcastError> {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(a) => a.schema_version(),
            #[cfg(feature = "postgres")]
            Backend::Postgres(a) => a.schema_version(),
        }
    }

    pub fn store(&self) -> &dyn ObservationStore {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(a) => a,
            #[cfg(feature = "postgres")]
            Backend::Postgres(a) => a,
        }
    }

    pub fn ledger(&self) -> &dyn ForecastLedger {
        match self {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(a) => a,
            #[cfg(feature = "postgres")]
            Backend::Postgres(a) => a,
        }
    }
}

/// Loaded configuration plus a migrated backend.
pub struct Context {
    pub config: FileConfigAdapter,
    pub backend: Backend,
}

impl Context {
    pub fn open(config_path: &Path) -> Result<Self, StockcastError> {
        info!("Loading config from {}", config_path.display());
        let config = load_config(config_path)?;
        let backend = Backend::from_config(&config)?;
        backend.migrate()?;
        Ok(Self { config, backend })
    }
}

pub fn build_forecast_config(config: &dyn ConfigPort) -> ForecastConfig {
    ForecastConfig {
        min_window: config
            .get_int("forecast", "min_window", DEFAULT_MIN_WINDOW as i64)
            .max(1) as usize,
        history_years: config
            .get_int("market_data", "history_years", DEFAULT_HISTORY_YEARS as i64)
            .max(1) as u32,
        parallel: config.get_bool("forecast", "parallel", true),
    }
}

pub fn build_strategy_settings(
    config: &dyn ConfigPort,
) -> Result<StrategySettings, StockcastError> {
    let defaults = StrategySettings::default();
    let enabled = match config.get_string("strategies", "enabled") {
        Some(list) => parse_kinds(&list)?,
        None => defaults.enabled.clone(),
    };
    let window = |key: &str, default: usize| {
        config.get_int("strategies", key, default as i64).max(1) as usize
    };

    Ok(StrategySettings {
        enabled,
        sma_window: window("sma_window", defaults.sma_window),
        ema_period: window("ema_period", defaults.ema_period),
        wma_period: window("wma_period", defaults.wma_period),
        drift_window: window("drift_window", defaults.drift_window),
    })
}

pub fn build_strategy_registry(config: &dyn ConfigPort) -> Result<StrategyRegistry, StockcastError> {
    build_registry(&build_strategy_settings(config)?)
}

/// CSV provider when `[market_data] csv_dir` is set.
pub fn build_market_data(config: &dyn ConfigPort) -> Option<CsvMarketDataAdapter> {
    let dir = config.get_string("market_data", "csv_dir")?;
    let page_size = config
        .get_int("market_data", "page_size", DEFAULT_PAGE_SIZE as i64)
        .max(1) as usize;
    Some(CsvMarketDataAdapter::with_page_size(
        PathBuf::from(dir),
        page_size,
    ))
}

fn require_market_data(config: &dyn ConfigPort) -> Result<CsvMarketDataAdapter, StockcastError> {
    build_market_data(config).ok_or_else(|| StockcastError::ConfigMissing {
        section: "market_data".into(),
        key: "csv_dir".into(),
    })
}

/// Symbols to work on: the override alone, or the configured list followed
/// by any other registered symbols.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
    store: &dyn ObservationStore,
) -> Result<Vec<String>, StockcastError> {
    if let Some(s) = symbol_override {
        return Ok(vec![s.trim().to_uppercase()]);
    }

    let mut symbols: Vec<String> = Vec::new();
    let configured = config.get_string("forecast", "symbols").unwrap_or_default();
    for s in configured
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .chain(store.list_symbols()?)
    {
        if !symbols.contains(&s) {
            symbols.push(s);
        }
    }
    Ok(symbols)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn run_migrate(config_path: &Path) -> Result<(), StockcastError> {
    let config = load_config(config_path)?;
    let backend = Backend::from_config(&config)?;
    let applied = backend.migrate()?;
    println!(
        "Applied {} migrations (schema version {})",
        applied,
        backend.schema_version()?
    );
    Ok(())
}

fn run_add_symbol(config_path: &Path, symbol: &str) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    ctx.backend.store().register_symbol(symbol)?;
    println!("Registered {}", symbol);
    Ok(())
}

fn run_fetch(
    config_path: &Path,
    symbol: Option<&str>,
    as_of: Option<NaiveDate>,
) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    let provider = require_market_data(&ctx.config)?;
    let store = ctx.backend.store();
    let history_years = build_forecast_config(&ctx.config).history_years;
    let as_of = as_of.unwrap_or_else(today);

    let mut first_error = None;
    for s in resolve_symbols(symbol, &ctx.config, store)? {
        match sync_observations(&provider, store, &s, as_of, history_years) {
            Ok(n) => println!("{}: {} new bars", s, n),
            Err(e) => {
                error!("{s}: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn run_forecast(config_path: &Path, symbol: Option<&str>) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    let registry = build_strategy_registry(&ctx.config)?;
    let orchestrator = Orchestrator::new(
        ctx.backend.store(),
        ctx.backend.ledger(),
        &registry,
        build_forecast_config(&ctx.config),
    );
    let report = TextReportAdapter::stdout();

    let mut first_error = None;
    for s in resolve_symbols(symbol, &ctx.config, ctx.backend.store())? {
        match orchestrator.forecast_symbol(&s) {
            Ok(pass) => report.write_forecasts(&pass)?,
            Err(e) => {
                error!("{s}: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn run_score(config_path: &Path, symbol: Option<&str>) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    let registry = build_strategy_registry(&ctx.config)?;
    let orchestrator = Orchestrator::new(
        ctx.backend.store(),
        ctx.backend.ledger(),
        &registry,
        build_forecast_config(&ctx.config),
    );

    let mut first_error = None;
    for s in resolve_symbols(symbol, &ctx.config, ctx.backend.store())? {
        match orchestrator.score_symbol(&s) {
            Ok(pass) => println!(
                "{}: scored {}, awaiting outcome {}",
                pass.symbol, pass.scored, pass.awaiting
            ),
            Err(e) => {
                error!("{s}: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn run_report(config_path: &Path, symbol: Option<&str>) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    let registry = build_strategy_registry(&ctx.config)?;
    let orchestrator = Orchestrator::new(
        ctx.backend.store(),
        ctx.backend.ledger(),
        &registry,
        build_forecast_config(&ctx.config),
    );
    let report = TextReportAdapter::stdout();

    let mut first_error = None;
    for s in resolve_symbols(symbol, &ctx.config, ctx.backend.store())? {
        match orchestrator.accuracy(Some(&s)) {
            Ok(accuracy) => report.write_accuracy(&s, &accuracy)?,
            Err(e) => {
                error!("{s}: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    if symbol.is_none() {
        report.write_accuracy("Overall", &orchestrator.accuracy(None)?)?;
    }
    first_error.map_or(Ok(()), Err)
}

fn run_pipeline(
    config_path: &Path,
    symbol: Option<&str>,
    as_of: Option<NaiveDate>,
) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    let registry = build_strategy_registry(&ctx.config)?;
    let provider = build_market_data(&ctx.config);
    let mut orchestrator = Orchestrator::new(
        ctx.backend.store(),
        ctx.backend.ledger(),
        &registry,
        build_forecast_config(&ctx.config),
    );
    if let Some(p) = provider.as_ref() {
        orchestrator = orchestrator.with_market_data(p as &dyn MarketDataPort);
    } else {
        info!("No [market_data] csv_dir configured, forecasting stored observations only");
    }

    let symbols = resolve_symbols(symbol, &ctx.config, ctx.backend.store())?;
    let report = TextReportAdapter::stdout();
    let mut first_error = None;

    for outcome in orchestrator.run_all(&symbols, as_of.unwrap_or_else(today)) {
        match outcome.result {
            Ok(run) => {
                if run.fetched > 0 {
                    println!("{}: {} new bars", run.symbol, run.fetched);
                }
                report.write_forecasts(&run.forecasts)?;
                println!(
                    "{}: scored {}, awaiting outcome {}",
                    run.symbol, run.scoring.scored, run.scoring.awaiting
                );
                report.write_accuracy(&run.symbol, &run.accuracy)?;
            }
            Err(e) => {
                eprintln!("{}: failed: {}", outcome.symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if symbols.len() > 1 {
        report.write_accuracy("Overall", &orchestrator.accuracy(None)?)?;
    }
    first_error.map_or(Ok(()), Err)
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), StockcastError> {
    let ctx = Context::open(config_path)?;
    let store = ctx.backend.store();
    let ledger = ctx.backend.ledger();

    let symbols = resolve_symbols(symbol, &ctx.config, store)?;
    if symbols.is_empty() {
        eprintln!("No symbols registered");
    }
    for s in &symbols {
        match store.data_range(s)? {
            Some((min_date, max_date, count)) => {
                println!("{}: {} bars, {} to {}", s, count, min_date, max_date)
            }
            None => println!("{}: no observations", s),
        }
        println!(
            "  forecasts: {}, awaiting score: {}",
            ledger.forecast_count(s)?,
            ledger.pending(s)?.len()
        );
    }
    Ok(())
}

fn run_strategies(config_path: &Path) -> Result<(), StockcastError> {
    let config = load_config(config_path)?;
    let registry = build_strategy_registry(&config)?;
    for name in registry.names() {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn forecast_config_defaults() {
        let config = build_forecast_config(&make_config(""));
        assert_eq!(config, ForecastConfig::default());
    }

    #[test]
    fn forecast_config_reads_sections() {
        let config = build_forecast_config(&make_config(
            "[forecast]\nmin_window = 30\nparallel = no\n[market_data]\nhistory_years = 2\n",
        ));
        assert_eq!(config.min_window, 30);
        assert_eq!(config.history_years, 2);
        assert!(!config.parallel);
    }

    #[test]
    fn strategy_settings_override_windows() {
        let settings = build_strategy_settings(&make_config(
            "[strategies]\nenabled = sma, drift\nsma_window = 5\ndrift_window = 60\n",
        ))
        .unwrap();
        assert_eq!(settings.sma_window, 5);
        assert_eq!(settings.drift_window, 60);
        assert_eq!(settings.ema_period, 10);

        let registry = build_registry(&settings).unwrap();
        assert_eq!(registry.names(), vec!["sma_5", "drift_60"]);
    }

    #[test]
    fn default_registry_has_every_kind() {
        let registry = build_strategy_registry(&make_config("")).unwrap();
        assert_eq!(
            registry.names(),
            vec!["last_close", "sma_20", "ema_10", "wma_10", "drift_250"]
        );
    }

    #[test]
    fn market_data_requires_csv_dir() {
        assert!(build_market_data(&make_config("")).is_none());
        assert!(build_market_data(&make_config("[market_data]\ncsv_dir = /tmp\n")).is_some());
        assert!(matches!(
            require_market_data(&make_config("")),
            Err(StockcastError::ConfigMissing { key, .. }) if key == "csv_dir"
        ));
    }

    #[test]
    fn load_config_missing_file_is_parse_error() {
        let err = load_config(Path::new("/nonexistent/stockcast.ini")).unwrap_err();
        assert!(matches!(err, StockcastError::ConfigParse { .. }));
    }

    #[test]
    fn cli_parses_run_with_date() {
        let cli = Cli::try_parse_from([
            "stockcast",
            "run",
            "-c",
            "stockcast.ini",
            "--symbol",
            "aapl",
            "--as-of",
            "2024-03-01",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                symbol, as_of, ..
            } => {
                assert_eq!(symbol.as_deref(), Some("AAPL"));
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 3, 1));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn add_symbol_requires_symbol() {
        assert!(Cli::try_parse_from(["stockcast", "add-symbol", "-c", "x.ini"]).is_err());
    }

    #[test]
    fn blank_symbol_is_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["stockcast", "add-symbol", "-c", "x.ini", "--symbol", "  "])
            .unwrap_err();
        assert!(err.to_string().contains("symbol must not be empty"));
        assert!(
            Cli::try_parse_from(["stockcast", "forecast", "-c", "x.ini", "--symbol", ""]).is_err()
        );
    }

    #[test]
    fn symbol_argument_is_normalized() {
        let cli =
            Cli::try_parse_from(["stockcast", "add-symbol", "-c", "x.ini", "--symbol", " msft "])
                .unwrap();
        match cli.command {
            Command::AddSymbol { symbol, .. } => assert_eq!(symbol, "MSFT"),
            other => panic!("expected add-symbol, got {other:?}"),
        }
    }
}
