//! Plain-text report adapter implementing ReportPort.

use crate::domain::accuracy::{AccuracyReport, StrategyAccuracy};
use crate::domain::error::StockcastError;
use crate::domain::orchestrator::{DailyForecast, ForecastPass};
use crate::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::io::{self, Stdout, Write};

/// `+` when the prediction is above the last known close.
fn direction_sign(predicted: f64, last_close: f64) -> char {
    if predicted > last_close { '+' } else { '-' }
}

/// `2024-01-05: sma_20: 101.25 (+). ema_10: 99.75 (-). Combined: 100.50 (+).`
pub fn format_daily_forecast(day: &DailyForecast) -> String {
    let mut line = format!("{}:", day.date.format("%Y-%m-%d"));
    for f in &day.forecasts {
        line.push_str(&format!(
            " {}: {:.2} ({}).",
            f.strategy,
            f.predicted_close,
            direction_sign(f.predicted_close, day.last_close)
        ));
    }
    if let Some(combined) = day.combined {
        line.push_str(&format!(
            " Combined: {:.2} ({}).",
            combined,
            direction_sign(combined, day.last_close)
        ));
    }
    line
}

pub fn format_accuracy_row(row: &StrategyAccuracy) -> String {
    match (row.accuracy, row.mean_absolute_error) {
        (Some(accuracy), Some(mae)) => format!(
            "{:<16} {:>6} scored  {:>6.2}% correct  MAE {:.4}",
            row.strategy, row.scored, accuracy, mae
        ),
        _ => format!("{:<16} no data", row.strategy),
    }
}

pub struct TextReportAdapter<W: Write> {
    out: RefCell<W>,
}

impl TextReportAdapter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextReportAdapter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> ReportPort for TextReportAdapter<W> {
    fn write_forecasts(&self, pass: &ForecastPass) -> Result<(), StockcastError> {
        let mut out = self.out.borrow_mut();
        if pass.days.is_empty() {
            writeln!(out, "{}: no new forecasts", pass.symbol)?;
        } else {
            writeln!(out, "{}:", pass.symbol)?;
            for day in &pass.days {
                writeln!(out, "  {}", format_daily_forecast(day))?;
            }
        }
        if !pass.skipped.is_empty() {
            writeln!(
                out,
                "  {} dates awaiting enough history",
                pass.skipped.len()
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn write_accuracy(&self, title: &str, report: &AccuracyReport) -> Result<(), StockcastError> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "{}", title)?;
        if report.rows.is_empty() {
            writeln!(out, "  no data")?;
        }
        for row in &report.rows {
            writeln!(out, "  {}", format_accuracy_row(row))?;
        }
        out.flush()?;
        Ok(())
    }
}
