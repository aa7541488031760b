//! Report output port trait.

use crate::domain::accuracy::AccuracyReport;
use crate::domain::error::StockcastError;
use crate::domain::orchestrator::ForecastPass;

/// Port for writing human-readable forecast and accuracy summaries.
pub trait ReportPort {
    fn write_forecasts(&self, pass: &ForecastPass) -> Result<(), StockcastError>;

    fn write_accuracy(&self, title: &str, report: &AccuracyReport) -> Result<(), StockcastError>;
}
