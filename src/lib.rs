//! stockcast: walk-forward next-day close forecasting with a persistent
//! forecast ledger and directional back-testing.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command line in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one storage backend feature: sqlite or postgres");
