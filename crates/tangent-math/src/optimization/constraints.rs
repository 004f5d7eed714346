//! Box constraints with a linear budget.

use crate::error::{MathError, MathResult};

/// Slack allowed when checking that the bounds can reach the budget.
const FEASIBILITY_SLACK: f64 = 1e-12;

/// Bisection steps for the projection multiplier. Each halves the bracket,
/// so this reaches machine precision for any realistic bound range.
const PROJECTION_BISECTIONS: usize = 200;

/// The set `{ x : lower <= x <= upper, sum(x) == total }`.
///
/// With `lower = 0`, `upper = 1` and `total = 1` this is the probability
/// simplex, i.e. long-only, fully-invested weights.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSimplex {
    lower: Vec<f64>,
    upper: Vec<f64>,
    total: f64,
}

impl BoxSimplex {
    /// Creates a constraint set, checking that it is non-empty.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>, total: f64) -> MathResult<Self> {
        if lower.len() != upper.len() {
            return Err(MathError::invalid_input(format!(
                "Bound vectors differ in length: {} lower, {} upper",
                lower.len(),
                upper.len()
            )));
        }
        if lower.is_empty() {
            return Err(MathError::insufficient_data(1, 0));
        }
        if !total.is_finite() {
            return Err(MathError::invalid_input("Budget total must be finite"));
        }
        for (i, (lo, hi)) in lower.iter().zip(&upper).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(MathError::invalid_input(format!("Bounds for index {i} must be finite")));
            }
            if lo > hi {
                return Err(MathError::invalid_input(format!(
                    "Lower bound {lo} exceeds upper bound {hi} at index {i}"
                )));
            }
        }

        let lower_sum: f64 = lower.iter().sum();
        let upper_sum: f64 = upper.iter().sum();
        if lower_sum > total + FEASIBILITY_SLACK || upper_sum < total - FEASIBILITY_SLACK {
            return Err(MathError::InfeasibleConstraints {
                lower_sum,
                upper_sum,
                total,
            });
        }

        Ok(Self {
            lower,
            upper,
            total,
        })
    }

    /// Uniform bounds `[lower, upper]` on `n` coordinates summing to one.
    pub fn uniform(n: usize, lower: f64, upper: f64) -> MathResult<Self> {
        Self::new(vec![lower; n], vec![upper; n], 1.0)
    }

    /// Long-only weights: `[0, 1]` bounds summing to one.
    pub fn long_only(n: usize) -> MathResult<Self> {
        Self::uniform(n, 0.0, 1.0)
    }

    /// Number of coordinates.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Lower bounds.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper bounds.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Required coordinate sum.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Returns true if `x` satisfies the bounds exactly and the budget within `tol`.
    #[must_use]
    pub fn contains(&self, x: &[f64], tol: f64) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| v.is_finite() && v >= lo && v <= hi)
            && (x.iter().sum::<f64>() - self.total).abs() <= tol
    }

    /// Clamps each coordinate into its bounds without touching the budget.
    #[must_use]
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect()
    }

    /// Equal split of the budget, projected if that violates the bounds.
    #[must_use]
    pub fn equal_weight_start(&self) -> Vec<f64> {
        let n = self.dim();
        let equal = vec![self.total / n as f64; n];
        if self.contains(&equal, 1e-12) {
            equal
        } else {
            self.project(&equal)
        }
    }

    /// Euclidean projection onto the set.
    ///
    /// The projection has the form `x_i = clamp(v_i - tau, lower_i, upper_i)`
    /// where `tau` makes the coordinates sum to `total`. The sum is monotone
    /// in `tau`, so `tau` is found by bisection. Non-finite inputs are
    /// treated as zero.
    #[must_use]
    pub fn project(&self, v: &[f64]) -> Vec<f64> {
        let v: Vec<f64> = v
            .iter()
            .map(|x| if x.is_finite() { *x } else { 0.0 })
            .collect();

        let shifted_sum = |tau: f64| -> f64 {
            v.iter()
                .zip(self.lower.iter().zip(&self.upper))
                .map(|(x, (lo, hi))| (x - tau).clamp(*lo, *hi))
                .sum()
        };

        // At tau_lo every coordinate sits at its upper bound, at tau_hi at its lower bound.
        let mut tau_lo = v
            .iter()
            .zip(&self.upper)
            .map(|(x, hi)| x - hi)
            .fold(f64::INFINITY, f64::min);
        let mut tau_hi = v
            .iter()
            .zip(&self.lower)
            .map(|(x, lo)| x - lo)
            .fold(f64::NEG_INFINITY, f64::max);

        for _ in 0..PROJECTION_BISECTIONS {
            let mid = 0.5 * (tau_lo + tau_hi);
            if mid <= tau_lo || mid >= tau_hi {
                break;
            }
            if shifted_sum(mid) > self.total {
                tau_lo = mid;
            } else {
                tau_hi = mid;
            }
        }

        let tau = 0.5 * (tau_lo + tau_hi);
        v.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(x, (lo, hi))| (x - tau).clamp(*lo, *hi))
            .collect()
    }
}
