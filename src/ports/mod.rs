//! Port traits: the interfaces the domain needs from the outside world.

pub mod config_port;
pub mod ledger_port;
pub mod market_data_port;
pub mod observation_port;
pub mod report_port;
