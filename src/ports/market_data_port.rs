//! Market data provider port trait.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use chrono::NaiveDate;

/// One page of daily bars plus the token for the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct BarPage {
    pub bars: Vec<Observation>,
    pub next_page_token: Option<String>,
}

pub trait MarketDataPort {
    /// Daily bars for `symbol` with `from <= date <= to`.
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<BarPage, StockcastError>;
}
