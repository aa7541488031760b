//! Daily price bar ("candle") representation.

use chrono::NaiveDate;

/// One day's OHLCV record for a symbol. `date` is the UTC calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trade_count: i64,
    pub vwap: f64,
}

/// All observations strictly before `date`.
///
/// `observations` must be sorted ascending by date, which is how every
/// `ObservationStore` returns them.
pub fn history_before(observations: &[Observation], date: NaiveDate) -> &[Observation] {
    let end = observations.partition_point(|o| o.date < date);
    &observations[..end]
}

/// Closing prices of a history slice, oldest first.
pub fn closes(history: &[Observation]) -> Vec<f64> {
    history.iter().map(|o| o.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bar(day: u32, close: f64) -> Observation {
        Observation {
            symbol: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
            trade_count: 10,
            vwap: close,
        }
    }

    #[test]
    fn history_before_excludes_the_date_itself() {
        let bars = vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0)];
        let slice = history_before(&bars, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.last().unwrap().date.to_string(), "2024-01-02");
    }

    #[test]
    fn history_before_gap_day() {
        // Jan 4 and 5 missing: a forecast for Jan 6 sees everything up to Jan 3
        let bars = vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0), bar(8, 13.0)];
        let slice = history_before(&bars, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(slice.len(), 3);
    }

    #[test]
    fn history_before_first_date_is_empty() {
        let bars = vec![bar(1, 10.0), bar(2, 11.0)];
        assert!(history_before(&bars, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).is_empty());
    }

    #[test]
    fn closes_in_order() {
        let bars = vec![bar(1, 10.0), bar(2, 11.0)];
        assert_eq!(closes(&bars), vec![10.0, 11.0]);
    }

    proptest! {
        #[test]
        fn history_before_never_looks_ahead(
            gaps in prop::collection::vec(1i64..5, 0..60),
            probe in 0i64..300,
        ) {
            let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let mut day = start;
            let mut bars = Vec::new();
            for gap in gaps {
                day += chrono::Duration::days(gap);
                let mut b = bar(1, 10.0);
                b.date = day;
                bars.push(b);
            }

            let date = start + chrono::Duration::days(probe);
            let history = history_before(&bars, date);
            prop_assert!(history.iter().all(|o| o.date < date));
            prop_assert_eq!(
                history.len(),
                bars.iter().filter(|o| o.date < date).count()
            );
        }
    }
}
