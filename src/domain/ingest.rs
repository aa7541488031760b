//! Observation ingestion from a market data provider.

use crate::domain::error::StockcastError;
use crate::domain::observation::Observation;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::observation_port::ObservationStore;
use chrono::{Months, NaiveDate};
use log::{debug, info};
use std::collections::BTreeMap;

/// Fetch the bars the store is missing for `symbol` and store them.
///
/// Resumes the day after the latest stored bar, or `history_years` before
/// `as_of` for a new symbol. Returns the number of bars written.
pub fn sync_observations(
    provider: &dyn MarketDataPort,
    store: &dyn ObservationStore,
    symbol: &str,
    as_of: NaiveDate,
    history_years: u32,
) -> Result<usize, StockcastError> {
    store.register_symbol(symbol)?;

    let from = match store.latest(symbol)? {
        Some(latest) => match latest.date.succ_opt() {
            Some(d) => d,
            None => return Ok(0),
        },
        None => as_of
            .checked_sub_months(Months::new(history_years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN),
    };

    if from > as_of {
        debug!("{symbol}: observations already current through {as_of}");
        return Ok(0);
    }

    info!("Fetching bars for {symbol} from {from} to {as_of}");
    let bars = fetch_all_pages(provider, symbol, from, as_of)?;

    let mut inserted = 0;
    for bar in bars.values() {
        if store.insert_if_absent(bar)? {
            inserted += 1;
        }
    }

    info!("{symbol}: stored {inserted} new bars");
    Ok(inserted)
}

/// Follow page tokens to the end, keeping the first bar seen per date.
fn fetch_all_pages(
    provider: &dyn MarketDataPort,
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<BTreeMap<NaiveDate, Observation>, StockcastError> {
    let mut by_date = BTreeMap::new();
    let mut token: Option<String> = None;

    loop {
        let page = provider.fetch_daily_bars(symbol, from, to, token.as_deref())?;
        for bar in page.bars {
            if bar.symbol != symbol || bar.date < from || bar.date > to {
                continue;
            }
            by_date.entry(bar.date).or_insert(bar);
        }

        match page.next_page_token {
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                return Err(StockcastError::MarketData {
                    reason: format!("provider repeated page token {next} for {symbol}"),
                });
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(by_date)
}
