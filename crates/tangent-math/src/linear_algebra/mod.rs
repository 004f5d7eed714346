//! Linear algebra utilities.
//!
//! Dense helpers for the small, square systems that show up in allocation
//! problems: covariance quadratic forms and the KKT systems solved inside
//! the SQP subproblem.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Pivot magnitude, relative to the largest entry, below which a matrix is
/// treated as singular.
const PIVOT_EPSILON: f64 = 1e-14;

/// Dot product of two equal-length slices.
///
/// Extra trailing entries in the longer slice are ignored.
#[must_use]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Matrix-vector product for a row-major matrix.
#[must_use]
pub fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, v)).collect()
}

/// Quadratic form `vᵀ M v`.
#[must_use]
pub fn quadratic_form(matrix: &[Vec<f64>], v: &[f64]) -> f64 {
    dot(v, &mat_vec(matrix, v))
}

/// Returns true if every row has as many entries as there are rows.
#[must_use]
pub fn is_square(matrix: &[Vec<f64>]) -> bool {
    let n = matrix.len();
    matrix.iter().all(|row| row.len() == n)
}

/// Returns true if the matrix is square and `|m[i][j] - m[j][i]| <= tol`.
#[must_use]
pub fn is_symmetric(matrix: &[Vec<f64>], tol: f64) -> bool {
    if !is_square(matrix) {
        return false;
    }
    let n = matrix.len();
    (0..n).all(|i| (i + 1..n).all(|j| (matrix[i][j] - matrix[j][i]).abs() <= tol))
}

/// LU factorization with partial pivoting: `P A = L U`.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    /// Unit lower triangular factor.
    pub l: DMatrix<f64>,
    /// Upper triangular factor.
    pub u: DMatrix<f64>,
    /// Row permutation: row `i` of `P A` is row `perm[i]` of `A`.
    pub perm: Vec<usize>,
}

/// Performs LU decomposition of a square matrix with partial pivoting.
///
/// Returns `L`, `U` and the row permutation such that `P A = L U`. Pivoting
/// is required for the saddle-point KKT matrices the SQP solver builds,
/// whose trailing diagonal block is zero.
pub fn lu_decomposition(matrix: &DMatrix<f64>) -> MathResult<LuDecomposition> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(MathError::invalid_input("Matrix must be square for LU decomposition"));
    }

    let threshold = PIVOT_EPSILON * matrix.amax();
    let mut l = DMatrix::identity(n, n);
    let mut u = matrix.clone();
    let mut perm: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut pivot_row = k;
        let mut pivot_val = u[(k, k)].abs();
        for i in k + 1..n {
            if u[(i, k)].abs() > pivot_val {
                pivot_val = u[(i, k)].abs();
                pivot_row = i;
            }
        }

        // Also rejects NaN pivots and the all-zero matrix.
        if !(pivot_val > threshold) {
            return Err(MathError::SingularMatrix);
        }

        if pivot_row != k {
            u.swap_rows(k, pivot_row);
            perm.swap(k, pivot_row);
            // Only the already-computed multipliers move with the row.
            for j in 0..k {
                let tmp = l[(k, j)];
                l[(k, j)] = l[(pivot_row, j)];
                l[(pivot_row, j)] = tmp;
            }
        }

        for i in k + 1..n {
            let factor = u[(i, k)] / u[(k, k)];
            l[(i, k)] = factor;

            for j in k..n {
                u[(i, j)] -= factor * u[(k, j)];
            }
        }
    }

    Ok(LuDecomposition { l, u, perm })
}

/// Solves a linear system Ax = b using pivoted LU decomposition.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(MathError::invalid_input("Matrix must be square"));
    }
    if n != b.len() {
        return Err(MathError::square_mismatch(n, b.len()));
    }

    let LuDecomposition { l, u, perm } = lu_decomposition(a)?;

    // Solve Ly = Pb (forward substitution)
    let mut y = DVector::zeros(n);
    for i in 0..n {
        let mut sum = b[perm[i]];
        for j in 0..i {
            sum -= l[(i, j)] * y[j];
        }
        y[i] = sum;
    }

    // Solve Ux = y (back substitution)
    let mut x = DVector::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in i + 1..n {
            sum -= u[(i, j)] * x[j];
        }
        x[i] = sum / u[(i, i)];
    }

    Ok(x)
}
