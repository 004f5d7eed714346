//! Sequential quadratic programming over a box-and-budget set.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use super::{
    inf_norm, solve_box_budget_qp, BoxSimplex, ConstrainedMinimizer, Objective,
    OptimizationConfig, OptimizationResult, ARMIJO, MIN_LINE_STEP,
};
use crate::error::{MathError, MathResult};
use crate::linear_algebra::dot;

/// Curvature ratio below which the BFGS update is damped (Powell).
const DAMPING_THRESHOLD: f64 = 0.2;

/// Quasi-Newton SQP minimizer in the SLSQP family.
///
/// Each iteration builds a quadratic model from a damped-BFGS Hessian
/// approximation, solves it over the linearized constraints with an
/// active-set method, and backtracks along the resulting direction. Because
/// the constraints are linear the direction is always feasible, so every
/// iterate stays inside the [`BoxSimplex`].
///
/// Converges when the QP step falls below `config.tolerance` in the
/// infinity norm. A line search that cannot make progress with a freshly
/// reset Hessian ends the run; it counts as converged only if the step was
/// already below `sqrt(tolerance)`. A quadratic subproblem that cannot be
/// solved is handled the same way: the Hessian is reset once, and a second
/// failure ends the run unconverged at the current feasible iterate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqpSolver;

impl SqpSolver {
    /// Creates a new SQP solver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConstrainedMinimizer for SqpSolver {
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

        let mut x = if constraints.contains(start, 1e-12) {
            start.to_vec()
        } else {
            constraints.project(start)
        };
        let mut f = objective.value(&x);
        if !f.is_finite() {
            return Err(MathError::invalid_input("Objective is not finite at the starting point"));
        }
        let mut g = objective.gradient(&x);

        let mut hessian = DMatrix::<f64>::identity(n, n);
        let mut fresh_hessian = true;

        for iteration in 0..config.max_iterations {
            let lower: Vec<f64> = constraints
                .lower()
                .iter()
                .zip(&x)
                .map(|(lo, xi)| (lo - xi).min(0.0))
                .collect();
            let upper: Vec<f64> = constraints
                .upper()
                .iter()
                .zip(&x)
                .map(|(hi, xi)| (hi - xi).max(0.0))
                .collect();

            let qp = match solve_box_budget_qp(&hessian, &g, &lower, &upper) {
                Ok(qp) => qp,
                Err(err) if fresh_hessian => {
                    debug!("sqp subproblem failed at iteration {iteration}: {err}");
                    return Ok(finish(constraints, x, f, iteration, false));
                }
                Err(err) => {
                    trace!("sqp subproblem failed ({err}); resetting Hessian approximation");
                    hessian = DMatrix::identity(n, n);
                    fresh_hessian = true;
                    continue;
                }
            };
            let d = qp.step;
            let step_norm = inf_norm(&d);

            if step_norm <= config.tolerance {
                debug!("sqp converged in {iteration} iterations (f = {f:.6e})");
                return Ok(finish(constraints, x, f, iteration, true));
            }

            let slope = dot(&g, &d);
            let mut alpha = 1.0;
            let mut accepted: Option<(Vec<f64>, f64)> = None;
            while alpha >= MIN_LINE_STEP {
                let trial: Vec<f64> =
                    constraints.clamp(&x.iter().zip(&d).map(|(xi, di)| xi + alpha * di).collect::<Vec<_>>());
                let ft = objective.value(&trial);
                if ft.is_finite() && ft <= f + ARMIJO * alpha * slope {
                    accepted = Some((trial, ft));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((x_new, f_new)) = accepted else {
                if fresh_hessian {
                    let converged = step_norm <= config.tolerance.sqrt();
                    debug!(
                        "sqp line search stalled at iteration {iteration} (step {step_norm:.3e}, converged = {converged})"
                    );
                    return Ok(finish(constraints, x, f, iteration, converged));
                }
                trace!("sqp line search failed; resetting Hessian approximation");
                hessian = DMatrix::identity(n, n);
                fresh_hessian = true;
                continue;
            };

            let g_new = objective.gradient(&x_new);
            let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
            fresh_hessian = !damped_bfgs_update(&mut hessian, &s, &y);

            trace!("sqp iteration {iteration}: f = {f_new:.10e}, alpha = {alpha:.3e}");
            x = x_new;
            f = f_new;
            g = g_new;
        }

        debug!(
            "sqp exhausted {} iterations without converging (f = {f:.6e})",
            config.max_iterations
        );
        Ok(finish(constraints, x, f, config.max_iterations, false))
    }

    fn name(&self) -> &'static str {
        "SQP"
    }
}

/// Powell-damped BFGS update, keeping the approximation positive definite.
///
/// Returns false if the update was skipped.
fn damped_bfgs_update(hessian: &mut DMatrix<f64>, s: &[f64], y: &[f64]) -> bool {
    let s_vec = DVector::from_column_slice(s);
    let y_vec = DVector::from_column_slice(y);
    let bs = &*hessian * &s_vec;
    let sbs = s_vec.dot(&bs);
    if sbs <= f64::EPSILON * s_vec.norm_squared().max(f64::MIN_POSITIVE) {
        return false;
    }

    let sy = s_vec.dot(&y_vec);
    let theta = if sy >= DAMPING_THRESHOLD * sbs {
        1.0
    } else {
        (1.0 - DAMPING_THRESHOLD) * sbs / (sbs - sy)
    };
    let r = &y_vec * theta + &bs * (1.0 - theta);
    let sr = s_vec.dot(&r);
    if sr <= 0.0 {
        return false;
    }

    let updated = &*hessian - &bs * bs.transpose() / sbs + &r * r.transpose() / sr;
    if updated.iter().any(|v| !v.is_finite()) {
        return false;
    }
    *hessian = updated;
    true
}

/// Builds the result, removing any budget drift accumulated by clamping.
fn finish(
    constraints: &BoxSimplex,
    x: Vec<f64>,
    f: f64,
    iterations: u32,
    converged: bool,
) -> OptimizationResult {
    OptimizationResult {
        parameters: constraints.project(&x),
        objective_value: f,
        iterations,
        converged,
    }
}
