//! Spectral projected gradient.

use log::{debug, trace};

use super::{
    inf_norm, BoxSimplex, ConstrainedMinimizer, Objective, OptimizationConfig,
    OptimizationResult, ARMIJO, MIN_LINE_STEP,
};
use crate::error::{MathError, MathResult};
use crate::linear_algebra::dot;

const MIN_SPECTRAL_STEP: f64 = 1e-10;
const MAX_SPECTRAL_STEP: f64 = 1e10;

/// Projected gradient descent with Barzilai-Borwein step lengths.
///
/// Each iteration projects `x - lambda * g` onto the constraint set and
/// backtracks along the resulting feasible direction. Convergence is
/// measured by the projected-gradient residual `||P(x - g) - x||_inf`.
///
/// Cheaper per iteration than [`SqpSolver`](super::SqpSolver) and needs no
/// linear solves, but typically takes many more iterations.
#[derive(Debug, Clone, Copy)]
pub struct ProjectedGradientSolver {
    initial_step: f64,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self { initial_step: 1.0 }
    }
}

impl ProjectedGradientSolver {
    /// Creates a solver with the given first step length.
    #[must_use]
    pub fn new(initial_step: f64) -> Self {
        Self {
            initial_step: initial_step.clamp(MIN_SPECTRAL_STEP, MAX_SPECTRAL_STEP),
        }
    }
}

impl ConstrainedMinimizer for ProjectedGradientSolver {
    fn minimize(
        &self,
        objective: &dyn Objective,
        start: &[f64],
        constraints: &BoxSimplex,
        config: &OptimizationConfig,
    ) -> MathResult<OptimizationResult> {
        let n = constraints.dim();
        if start.len() != n {
            return Err(MathError::square_mismatch(n, start.len()));
        }

        let mut x = constraints.project(start);
        let mut f = objective.value(&x);
        if !f.is_finite() {
            return Err(MathError::invalid_input("Objective is not finite at the starting point"));
        }
        let mut g = objective.gradient(&x);
        let mut lambda = self.initial_step;

        for iteration in 0..config.max_iterations {
            let residual = projected_residual(constraints, &x, &g, 1.0);
            if inf_norm(&residual) <= config.tolerance {
                debug!("projected gradient converged in {iteration} iterations (f = {f:.6e})");
                return Ok(OptimizationResult {
                    parameters: x,
                    objective_value: f,
                    iterations: iteration,
                    converged: true,
                });
            }

            let d = projected_residual(constraints, &x, &g, lambda);
            let slope = dot(&g, &d);

            let mut alpha = 1.0;
            let mut accepted = None;
            while alpha >= MIN_LINE_STEP {
                let trial = constraints.clamp(
                    &x.iter()
                        .zip(&d)
                        .map(|(xi, di)| xi + alpha * di)
                        .collect::<Vec<_>>(),
                );
                let ft = objective.value(&trial);
                if ft.is_finite() && ft <= f + ARMIJO * alpha * slope {
                    accepted = Some((trial, ft));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((x_new, f_new)) = accepted else {
                let converged = inf_norm(&residual) <= config.tolerance.sqrt();
                debug!(
                    "projected gradient stalled at iteration {iteration} (residual {:.3e}, converged = {converged})",
                    inf_norm(&residual)
                );
                return Ok(OptimizationResult {
                    parameters: x,
                    objective_value: f,
                    iterations: iteration,
                    converged,
                });
            };

            let g_new = objective.gradient(&x_new);
            let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            lambda = if sy > 0.0 {
                (dot(&s, &s) / sy).clamp(MIN_SPECTRAL_STEP, MAX_SPECTRAL_STEP)
            } else {
                MAX_SPECTRAL_STEP
            };

            trace!("projected gradient iteration {iteration}: f = {f_new:.10e}, lambda = {lambda:.3e}");
            x = x_new;
            f = f_new;
            g = g_new;
        }

        debug!(
            "projected gradient exhausted {} iterations (f = {f:.6e})",
            config.max_iterations
        );
        Ok(OptimizationResult {
            parameters: x,
            objective_value: f,
            iterations: config.max_iterations,
            converged: false,
        })
    }

    fn name(&self) -> &'static str {
        "Projected Gradient"
    }
}

/// `P(x - lambda * g) - x`.
fn projected_residual(constraints: &BoxSimplex, x: &[f64], g: &[f64], lambda: f64) -> Vec<f64> {
    let target: Vec<f64> = x.iter().zip(g).map(|(xi, gi)| xi - lambda * gi).collect();
    constraints
        .project(&target)
        .iter()
        .zip(x)
        .map(|(p, xi)| p - xi)
        .collect()
}
