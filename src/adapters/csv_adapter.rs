//! CSV file market data adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv` with a header row naming the columns
//! `date,open,high,low,close,volume,trade_count,vwap`. Dates are either
//! `YYYY-MM-DD` or RFC 3339 timestamps, which are reduced to their UTC date.
//! Pages are cut from the rows inside the requested range; the page token
//! is the row offset of the next page.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::ports::market_data_port::{BarPage, MarketDataPort};
use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

pub struct CsvMarketDataAdapter {
    base_path: PathBuf,
    page_size: usize,
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    trade_count: Option<usize>,
    vwap: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, StockcastError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| StockcastError::MarketData {
                reason: format!("missing {} column", name),
            })
        };

        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            trade_count: find("trade_count"),
            vwap: find("vwap"),
        })
    }
}

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, StockcastError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| StockcastError::MarketData {
            reason: format!("missing {} value", name),
        })
}

fn parse_f64(record: &StringRecord, index: usize, name: &str) -> Result<f64, StockcastError> {
    field(record, index, name)?
        .parse()
        .map_err(|e| StockcastError::MarketData {
            reason: format!("invalid {} value: {}", name, e),
        })
}

pub fn parse_bar_date(value: &str) -> Result<NaiveDate, StockcastError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|e| StockcastError::MarketData {
            reason: format!("invalid date '{}': {}", value, e),
        })
}

impl CsvMarketDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self::with_page_size(base_path, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(base_path: PathBuf, page_size: usize) -> Self {
        Self {
            base_path,
            page_size: page_size.max(1),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Every bar in the file with `from <= date <= to`, ascending by date.
    fn read_range(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Observation>, StockcastError> {
        let path = self.csv_path(symbol);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| StockcastError::MarketData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let headers = rdr.headers().map_err(|e| StockcastError::MarketData {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let columns = Columns::from_headers(headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| StockcastError::MarketData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date = parse_bar_date(field(&record, columns.date, "date")?)?;
            if date < from || date > to {
                continue;
            }

            let close = parse_f64(&record, columns.close, "close")?;
            let trade_count = match columns.trade_count {
                Some(i) => field(&record, i, "trade_count")?.parse().map_err(|e| {
                    StockcastError::MarketData {
                        reason: format!("invalid trade_count value: {}", e),
                    }
                })?,
                None => 0,
            };
            let vwap = match columns.vwap {
                Some(i) => parse_f64(&record, i, "vwap")?,
                None => close,
            };

            bars.push(Observation {
                symbol: symbol.to_string(),
                date,
                open: parse_f64(&record, columns.open, "open")?,
                high: parse_f64(&record, columns.high, "high")?,
                low: parse_f64(&record, columns.low, "low")?,
                close,
                volume: parse_f64(&record, columns.volume, "volume")?,
                trade_count,
                vwap,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl MarketDataPort for CsvMarketDataAdapter {
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<BarPage, StockcastError> {
        let offset: usize = match page_token {
            Some(token) => token.parse().map_err(|_| StockcastError::MarketData {
                reason: format!("invalid page token '{}'", token),
            })?,
            None => 0,
        };

        let bars = self.read_range(symbol, from, to)?;
        let end = offset.saturating_add(self.page_size).min(bars.len());
        let page = bars.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = (end < bars.len()).then(|| end.to_string());

        Ok(BarPage {
            bars: page,
            next_page_token,
        })
    }
}
