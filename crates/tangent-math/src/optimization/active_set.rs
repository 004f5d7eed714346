//! Primal active-set solver for the SQP subproblem.
//!
//! Solves
//!
//! ```text
//! minimize    ½ dᵀ B d + gᵀ d
//! subject to  sum(d) = 0
//!             lower <= d <= upper
//! ```
//!
//! with `B` symmetric positive definite and `lower <= 0 <= upper`, so that
//! `d = 0` is a feasible start. Bounds in the working set are held fixed and
//! the remaining coordinates are solved from the equality-constrained KKT
//! system; blocking bounds are added and bounds with negative multipliers
//! are released until the KKT conditions hold.

use log::trace;
use nalgebra::{DMatrix, DVector};

use crate::error::{MathError, MathResult};
use crate::linear_algebra::solve_linear_system;
use crate::optimization::inf_norm;

/// Step size below which the subproblem step counts as zero.
const STEP_EPSILON: f64 = 1e-14;

/// Tolerance on bound multipliers when checking optimality.
const MULTIPLIER_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundState {
    Free,
    AtLower,
    AtUpper,
}

/// Solution of the box-and-budget quadratic subproblem.
#[derive(Debug, Clone)]
pub struct QpSolution {
    /// Step `d`; feasible even when `optimal` is false.
    pub step: Vec<f64>,
    /// Multiplier of the budget constraint at the solution.
    pub budget_multiplier: f64,
    /// Active-set iterations used.
    pub iterations: usize,
    /// Whether the KKT conditions were met.
    pub optimal: bool,
}

/// Solves the box-and-budget QP described in the module docs.
pub fn solve_box_budget_qp(
    hessian: &DMatrix<f64>,
    gradient: &[f64],
    lower: &[f64],
    upper: &[f64],
) -> MathResult<QpSolution> {
    let n = gradient.len();
    if hessian.nrows() != n || hessian.ncols() != n {
        return Err(MathError::DimensionMismatch {
            rows1: hessian.nrows(),
            cols1: hessian.ncols(),
            rows2: n,
            cols2: 1,
        });
    }
    if lower.len() != n || upper.len() != n {
        return Err(MathError::invalid_input("Bound vectors must match the gradient length"));
    }
    if lower.iter().zip(upper).any(|(lo, hi)| *lo > 0.0 || *hi < 0.0) {
        return Err(MathError::invalid_input("Zero step must be feasible: need lower <= 0 <= upper"));
    }

    let mut state: Vec<BoundState> = lower
        .iter()
        .zip(upper)
        .map(|(lo, hi)| {
            if *lo >= 0.0 {
                BoundState::AtLower
            } else if *hi <= 0.0 {
                BoundState::AtUpper
            } else {
                BoundState::Free
            }
        })
        .collect();

    let mut d = vec![0.0; n];
    let max_iterations = 10 * (n + 1) + 50;

    for iteration in 0..max_iterations {
        let r: Vec<f64> = (hessian * DVector::from_column_slice(&d))
            .iter()
            .zip(gradient)
            .map(|(bd, g)| bd + g)
            .collect();

        let free: Vec<usize> = (0..n).filter(|&i| state[i] == BoundState::Free).collect();

        let (p, nu) = if free.is_empty() {
            (vec![0.0; n], None)
        } else {
            let (p, nu) = equality_step(hessian, &r, &free, n)?;
            (p, Some(nu))
        };

        if inf_norm(&p) > STEP_EPSILON {
            // Longest step towards the equality-constrained minimizer that keeps bounds.
            let mut alpha = 1.0;
            let mut blocking: Option<(usize, BoundState)> = None;
            for &i in &free {
                if p[i] < 0.0 {
                    let t = (lower[i] - d[i]) / p[i];
                    if t < alpha {
                        alpha = t;
                        blocking = Some((i, BoundState::AtLower));
                    }
                } else if p[i] > 0.0 {
                    let t = (upper[i] - d[i]) / p[i];
                    if t < alpha {
                        alpha = t;
                        blocking = Some((i, BoundState::AtUpper));
                    }
                }
            }
            let alpha = alpha.max(0.0);

            for &i in &free {
                d[i] += alpha * p[i];
            }
            if let Some((i, side)) = blocking {
                state[i] = side;
                d[i] = if side == BoundState::AtLower {
                    lower[i]
                } else {
                    upper[i]
                };
            }
            continue;
        }

        // Stationary on the current working set: check bound multipliers.
        let nu = match nu {
            Some(nu) => nu,
            None => {
                // Every coordinate is fixed; any budget multiplier between these
                // limits satisfies the sign conditions.
                let nu_min = (0..n)
                    .filter(|&i| state[i] == BoundState::AtLower)
                    .map(|i| -r[i])
                    .fold(f64::NEG_INFINITY, f64::max);
                let nu_max = (0..n)
                    .filter(|&i| state[i] == BoundState::AtUpper)
                    .map(|i| -r[i])
                    .fold(f64::INFINITY, f64::min);
                if nu_min <= nu_max + MULTIPLIER_EPSILON {
                    let nu = if nu_min.is_finite() { nu_min } else { nu_max };
                    return Ok(QpSolution {
                        step: d,
                        budget_multiplier: if nu.is_finite() { nu } else { 0.0 },
                        iterations: iteration,
                        optimal: true,
                    });
                }
                nu_min
            }
        };

        let mut worst: Option<(usize, f64)> = None;
        for i in 0..n {
            let multiplier = match state[i] {
                BoundState::Free => continue,
                BoundState::AtLower => r[i] + nu,
                BoundState::AtUpper => -(r[i] + nu),
            };
            // Bounds pinned on both sides can never be released.
            if lower[i] == upper[i] {
                continue;
            }
            if multiplier < -MULTIPLIER_EPSILON && worst.map_or(true, |(_, m)| multiplier < m) {
                worst = Some((i, multiplier));
            }
        }

        match worst {
            Some((i, multiplier)) => {
                trace!("active set: releasing bound {i} (multiplier {multiplier:.3e})");
                state[i] = BoundState::Free;
            }
            None => {
                return Ok(QpSolution {
                    step: d,
                    budget_multiplier: nu,
                    iterations: iteration,
                    optimal: true,
                });
            }
        }
    }

    Ok(QpSolution {
        step: d,
        budget_multiplier: 0.0,
        iterations: max_iterations,
        optimal: false,
    })
}

/// Solves the KKT system on the free coordinates:
/// `B_FF p_F + nu 1 = -r_F`, `1ᵀ p_F = 0`.
fn equality_step(
    hessian: &DMatrix<f64>,
    r: &[f64],
    free: &[usize],
    n: usize,
) -> MathResult<(Vec<f64>, f64)> {
    let m = free.len();
    let mut kkt = DMatrix::zeros(m + 1, m + 1);
    let mut rhs = DVector::zeros(m + 1);

    for (a, &i) in free.iter().enumerate() {
        for (b, &j) in free.iter().enumerate() {
            kkt[(a, b)] = hessian[(i, j)];
        }
        kkt[(a, m)] = 1.0;
        kkt[(m, a)] = 1.0;
        rhs[a] = -r[i];
    }

    let solution = solve_linear_system(&kkt, &rhs)?;

    let mut p = vec![0.0; n];
    for (a, &i) in free.iter().enumerate() {
        p[i] = solution[a];
    }
    Ok((p, solution[m]))
}
