//! Constrained optimization algorithms.
//!
//! This module provides minimizers for smooth objectives over a
//! [`BoxSimplex`]: per-coordinate bounds plus a fixed coordinate sum.
//! That is exactly the feasible set of a fully-invested allocation.
//!
//! # Choosing a Minimizer
//!
//! | Minimizer | Model | Convergence | Cost per iteration |
//! |-----------|-------|-------------|--------------------|
//! | [`SqpSolver`] | Quasi-Newton QP (damped BFGS) | Superlinear near optimum | KKT solves, O(n³) |
//! | [`ProjectedGradientSolver`] | Spectral step + projection | Linear | O(n log(1/ε)) projection |
//!
//! Both keep every iterate feasible: bounds hold exactly and the sum
//! constraint holds to rounding error. Neither certifies global optimality;
//! on a convex objective a converged result is the global minimum.
//!
//! # Example
//!
//! ```rust
//! use tangent_math::optimization::{
//!     BoxSimplex, ConstrainedMinimizer, FnObjective, OptimizationConfig, SqpSolver,
//! };
//!
//! // Minimize x'x on the unit simplex: the answer is the centroid.
//! let objective = FnObjective(|x: &[f64]| x.iter().map(|v| v * v).sum::<f64>());
//! let simplex = BoxSimplex::long_only(4).unwrap();
//! let start = [1.0, 0.0, 0.0, 0.0];
//!
//! let result = SqpSolver::default()
//!     .minimize(&objective, &start, &simplex, &OptimizationConfig::default())
//!     .unwrap();
//! assert!(result.converged);
//! assert!((result.parameters[0] - 0.25).abs() < 1e-6);
//! ```

mod active_set;
mod constraints;
mod projected_gradient;
mod sqp;

pub use active_set::{solve_box_budget_qp, QpSolution};
pub use constraints::BoxSimplex;
pub use projected_gradient::ProjectedGradientSolver;
pub use sqp::SqpSolver;

use crate::error::MathResult;

/// Default convergence tolerance on the step infinity-norm.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Default maximum number of outer iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 500;

/// Armijo sufficient-decrease parameter shared by the line searches.
pub(crate) const ARMIJO: f64 = 1e-4;

/// Smallest line-search step tried before declaring a stall.
pub(crate) const MIN_LINE_STEP: f64 = 1e-12;

/// Configuration for optimization algorithms.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationConfig {
    /// Tolerance for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Step size for numerical gradients.
    pub step_size: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            step_size: 1e-8,
        }
    }
}

impl OptimizationConfig {
    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Optimal parameters found (the best feasible iterate if not converged).
    pub parameters: Vec<f64>,
    /// Final objective function value.
    pub objective_value: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Whether the optimization converged.
    pub converged: bool,
}

/// A smooth scalar function to be minimized.
pub trait Objective {
    /// Evaluates the objective at `x`.
    fn value(&self, x: &[f64]) -> f64;

    /// Gradient at `x`. Defaults to central differences.
    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        numerical_gradient(|p| self.value(p), x, OptimizationConfig::default().step_size)
    }
}

/// Adapts a closure into an [`Objective`] with a numerical gradient.
#[derive(Debug, Clone, Copy)]
pub struct FnObjective<F>(pub F);

impl<F> Objective for FnObjective<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn value(&self, x: &[f64]) -> f64 {
        (self.0)(x)
    }
}

/// Central-difference gradient.
pub fn numerical_gradient<F>(f: F, x: &[f64], step: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut point = x.to_vec();
    (0..x.len())
        .map(|i| {
            let orig = point[i];
            point[i] = orig + step;
            let up = f(&point);
            point[i] = orig - step;
            let down = f(&point);
            point[i] = orig;
            (up - down) / (2.0 * step)
        })
        .collect()
}

/// Trait for minimizers over a [`BoxSimplex`].
///
/// Implementations must return a feasible point even when they fail to
/// converge, with [`OptimizationResult::converged`] set accordingly.
pub trait ConstrainedMinimizer: Send + Sync {
    /// Minimizes `objective` starting from `start`.
    ///
    /// # Arguments
    ///
    /// * `objective` - Smooth function to minimize
    /// * `start` - Initial guess (projected onto the constraints if infeasible)
    /// * `constraints` - Bounds and budget
    /// * `config` - Tolerance and iteration budget
    fn minimize(
        &self,
        objective: &dyn Objective,
        start: &[f64],
        constraints: &BoxSimplex,
        config: &OptimizationConfig,
    ) -> MathResult<OptimizationResult>;

    /// Returns the name of the minimizer.
    fn name(&self) -> &'static str;
}

pub(crate) fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}
