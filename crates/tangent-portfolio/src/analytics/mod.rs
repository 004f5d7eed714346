//! Portfolio-level statistics.
//!
//! This module provides:
//! - The statistics aggregator ([`compute_metrics`])
//! - Portfolio return, volatility and the zero-guarded Sharpe ratio
//! - Input validation shared with the optimizer
//! - Config-driven parallel mapping
//!
//! All functions are pure - they take returns and configuration as input
//! and return computed results. No caching, no I/O, no side effects.

mod metrics;
mod parallel;
mod risk;

pub use metrics::*;
pub use parallel::*;
pub use risk::*;
