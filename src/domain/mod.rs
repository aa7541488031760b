//! Core domain types and logic.

pub mod accuracy;
pub mod config_validation;
pub mod error;
pub mod forecast;
pub mod ingest;
pub mod observation;
pub mod orchestrator;
pub mod schedule;
pub mod scorer;
pub mod strategies;
pub mod strategy;
