//! Domain types for portfolio statistics and allocation.
//!
//! - [`ReturnsTable`]: Per-asset periodic returns, column per asset
//! - [`ObjectiveMode`]: What the allocation optimizer minimizes
//! - [`EngineConfig`]: Annualization, bounds, solver and parallelism settings
//! - [`WeightBounds`]: Per-asset weight limits
//! - [`SolverChoice`]: Which constrained minimizer to run

mod config;
mod objective;
mod returns;

pub use config::{EngineConfig, SolverChoice, WeightBounds, DEFAULT_PERIODS_PER_YEAR};
pub use objective::ObjectiveMode;
pub use returns::ReturnsTable;
