//! # Tangent Data
//!
//! Price ingestion and return preprocessing for the Tangent portfolio engine.
//!
//! This crate turns raw close prices into the return tables the engine
//! consumes:
//! - CSV-based price tables (`Date,SYM1,SYM2,...`)
//! - Outer join of per-symbol price histories
//! - Simple and log returns
//! - Rolling mean and standard deviation
//!
//! Fetching prices from a market data vendor is left to the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod prices;
mod returns;

pub use error::{DataError, DataResult};
pub use prices::PriceTable;
pub use returns::{
    log_returns, prepare_returns, rolling_mean, rolling_stats, rolling_std, simple_returns,
    PreparedReturns, RollingStats, DEFAULT_ROLLING_WINDOW,
};
