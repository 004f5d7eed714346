//! # Tangent Portfolio
//!
//! Portfolio statistics and allocation optimization.
//!
//! This crate turns a table of historical per-asset returns into annualized
//! risk/return statistics and finds allocation weights that maximize the
//! Sharpe ratio or minimize volatility.
//!
//! ## Design Philosophy
//!
//! - **Pure functions**: All calculations are stateless with explicit inputs
//! - **Explicit assets**: The caller names the asset columns; nothing is inferred from tickers
//! - **Config-driven**: Annualization, bounds and solver live in [`EngineConfig`]
//! - **Honest results**: Non-convergence is flagged, never hidden
//!
//! ## Features
//!
//! - **Statistics**: Annualized return, risk, Sharpe ratio, covariance, correlation
//! - **Optimization**: Max Sharpe and min variance under budget and bound constraints
//! - **Scenarios**: Independent runs across risk-free rates, optionally in parallel
//!
//! ## Quick Start
//!
//! ```rust
//! use tangent_portfolio::prelude::*;
//!
//! let returns = ReturnsTable::from_columns(
//!     vec!["A".into(), "B".into()],
//!     vec![
//!         vec![0.010, -0.004, 0.007, 0.002, -0.001],
//!         vec![0.003, 0.012, -0.006, 0.009, 0.004],
//!     ],
//! )?;
//!
//! let config = EngineConfig::default();
//! let metrics = compute_metrics(&returns, None, &config)?;
//! let allocation = AllocationOptimizer::new(config)
//!     .optimize_metrics(&metrics, ObjectiveMode::MinVariance)?;
//!
//! assert!(allocation.converged);
//! assert!(allocation.volatility <= metrics.annualized_risk + 1e-12);
//! # Ok::<(), PortfolioError>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`analytics`] - Statistics aggregator, portfolio risk helpers, parallel mapping
//! - [`optimizer`] - Allocation optimizer and results
//! - [`types`] - Returns table, objective modes, configuration
//!
//! ## Feature Flags
//!
//! - `parallel`: Enable rayon-based parallel scenario runs

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

// Module declarations
pub mod analytics;
pub mod error;
pub mod optimizer;
pub mod types;

// Re-export error types at crate root
pub use error::{PortfolioError, PortfolioResult};

// Re-export main types
pub use types::{
    EngineConfig, ObjectiveMode, ReturnsTable, SolverChoice, WeightBounds,
    DEFAULT_PERIODS_PER_YEAR,
};

// Re-export analytics types and functions
pub use analytics::{
    compute_metrics, compute_metrics_for_assets, equal_weights, is_riskless, maybe_parallel_map,
    portfolio_return, portfolio_volatility, screened_sharpe_ratio, sharpe_ratio, PortfolioMetrics,
};

// Re-export optimizer
pub use optimizer::{optimize_portfolio, AllocationOptimizer, AllocationResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analytics::{compute_metrics, compute_metrics_for_assets, PortfolioMetrics};
    pub use crate::error::{PortfolioError, PortfolioResult};
    pub use crate::optimizer::{optimize_portfolio, AllocationOptimizer, AllocationResult};
    pub use crate::types::{EngineConfig, ObjectiveMode, ReturnsTable, SolverChoice, WeightBounds};
}
