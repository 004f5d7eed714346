//! Allocation optimization.
//!
//! Weights are chosen to maximize the Sharpe ratio or minimize volatility
//! over a fully-invested, bounded weight set. The minimizer is pluggable via
//! [`SolverChoice`](crate::types::SolverChoice); both available solvers keep
//! every iterate feasible.
//!
//! ## Optimality
//!
//! | Objective | Convex | A converged result is |
//! |-----------|--------|------------------------|
//! | `min_variance` | yes | the global minimum |
//! | `sharpe` | no | a local maximum |

mod allocation;
mod objectives;

pub use allocation::{optimize_portfolio, AllocationOptimizer, AllocationResult};
