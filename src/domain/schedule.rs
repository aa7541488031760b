//! Walk-forward scheduling: which calendar dates still need a forecast.
//!
//! For one (symbol, strategy) the walk covers every calendar day strictly
//! after the strategy's last forecast (or after the first observation when
//! it has none) up to and including the day after the latest observation.

use crate::domain::error::StockcastError;
use crate::ports::ledger_port::ForecastLedger;
use chrono::NaiveDate;

/// Lazy, finite sequence of forecast dates. Cloning restarts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSchedule {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl ForecastSchedule {
    pub fn new(last_forecast: NaiveDate, latest_observation: NaiveDate) -> Self {
        Self {
            next: last_forecast.succ_opt(),
            last: latest_observation.succ_opt().unwrap_or(latest_observation),
        }
    }

    /// Seed the walk from the ledger's latest forecast for the pair.
    pub fn for_strategy(
        ledger: &dyn ForecastLedger,
        symbol: &str,
        strategy: &str,
        first_observation: NaiveDate,
        latest_observation: NaiveDate,
    ) -> Result<Self, StockcastError> {
        let start = ledger
            .latest(symbol, strategy)?
            .map(|f| f.date)
            .unwrap_or(first_observation);
        Ok(Self::new(start, latest_observation))
    }

    /// Last date the walk will yield.
    pub fn end(&self) -> NaiveDate {
        self.last
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none_or(|d| d > self.last)
    }
}

impl Iterator for ForecastSchedule {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let date = self.next?;
        if date > self.last {
            return None;
        }
        self.next = date.succ_opt();
        Some(date)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(d) if d <= self.last => (self.last - d).num_days() as usize + 1,
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ForecastSchedule {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn walk_runs_through_day_after_latest() {
        let dates: Vec<_> = ForecastSchedule::new(d(2024, 1, 1), d(2024, 1, 4)).collect();
        assert_eq!(
            dates,
            vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 5)]
        );
    }

    #[test]
    fn caught_up_walk_is_empty() {
        let mut schedule = ForecastSchedule::new(d(2024, 1, 5), d(2024, 1, 4));
        assert!(schedule.is_exhausted());
        assert_eq!(schedule.len(), 0);
        assert_eq!(schedule.next(), None);
    }

    #[test]
    fn walk_crosses_month_and_year() {
        let dates: Vec<_> = ForecastSchedule::new(d(2023, 12, 30), d(2023, 12, 31)).collect();
        assert_eq!(dates, vec![d(2023, 12, 31), d(2024, 1, 1)]);
    }

    #[test]
    fn clone_restarts_with_same_boundaries() {
        let schedule = ForecastSchedule::new(d(2024, 2, 27), d(2024, 3, 1));
        let first: Vec<_> = schedule.clone().collect();
        let second: Vec<_> = schedule.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4); // leap day included
    }

    proptest! {
        #[test]
        fn walk_is_gapless_and_bounded(start_offset in 0i64..3000, span in 0i64..400) {
            let base = d(2015, 1, 1);
            let first = base + chrono::Duration::days(start_offset);
            let latest = first + chrono::Duration::days(span);
            let schedule = ForecastSchedule::new(first, latest);
            prop_assert_eq!(schedule.len() as i64, span + 1);

            let dates: Vec<_> = schedule.collect();
            prop_assert_eq!(dates.first().copied(), first.succ_opt());
            prop_assert_eq!(dates.last().copied(), latest.succ_opt());
            for pair in dates.windows(2) {
                prop_assert_eq!((pair[1] - pair[0]).num_days(), 1);
            }
        }
    }
}
