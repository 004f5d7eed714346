//! Objective functions with analytic gradients.

use tangent_math::linear_algebra::{dot, mat_vec};
use tangent_math::optimization::Objective;

use crate::types::ObjectiveMode;

/// Volatility floor used inside objectives so gradients stay finite.
const VOLATILITY_FLOOR: f64 = 1e-12;

/// `-(w·mu - rf) / sqrt(wᵀ Σ w)`.
///
/// Gradient: `-mu / s + (w·mu - rf) Σw / s³` with `s` the volatility.
pub(crate) struct NegativeSharpe<'a> {
    pub expected_returns: &'a [f64],
    pub covariance: &'a [Vec<f64>],
    pub risk_free_rate: f64,
}

impl Objective for NegativeSharpe<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        let excess = dot(w, self.expected_returns) - self.risk_free_rate;
        let vol = dot(w, &mat_vec(self.covariance, w)).max(0.0).sqrt();
        -excess / vol.max(VOLATILITY_FLOOR)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let sigma_w = mat_vec(self.covariance, w);
        let excess = dot(w, self.expected_returns) - self.risk_free_rate;
        let vol = dot(w, &sigma_w).max(0.0).sqrt();

        if vol <= VOLATILITY_FLOOR {
            return self
                .expected_returns
                .iter()
                .map(|m| -m / VOLATILITY_FLOOR)
                .collect();
        }

        let vol3 = vol * vol * vol;
        self.expected_returns
            .iter()
            .zip(&sigma_w)
            .map(|(m, sw)| -m / vol + excess * sw / vol3)
            .collect()
    }
}

/// `wᵀ Σ w`, with gradient `2 Σw`.
///
/// Minimizing variance rather than volatility keeps the objective smooth at
/// a riskless portfolio of a singular covariance, where `sqrt` has no
/// derivative. Both share the same minimizer.
pub(crate) struct Variance<'a> {
    pub covariance: &'a [Vec<f64>],
}

impl Objective for Variance<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        dot(w, &mat_vec(self.covariance, w))
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        mat_vec(self.covariance, w).iter().map(|sw| 2.0 * sw).collect()
    }
}

/// Builds the objective for `mode`.
pub(crate) fn objective_for<'a>(
    mode: ObjectiveMode,
    expected_returns: &'a [f64],
    covariance: &'a [Vec<f64>],
    risk_free_rate: f64,
) -> Box<dyn Objective + 'a> {
    match mode {
        ObjectiveMode::Sharpe => Box::new(NegativeSharpe {
            expected_returns,
            covariance,
            risk_free_rate,
        }),
        ObjectiveMode::MinVariance => Box::new(Variance { covariance }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tangent_math::optimization::numerical_gradient;

    fn cov() -> Vec<Vec<f64>> {
        vec![
            vec![0.04, 0.006, 0.002],
            vec![0.006, 0.09, -0.01],
            vec![0.002, -0.01, 0.0225],
        ]
    }

    #[test]
    fn test_sharpe_gradient_matches_finite_differences() {
        let cov = cov();
        let f = NegativeSharpe {
            expected_returns: &[0.08, 0.15, 0.05],
            covariance: &cov,
            risk_free_rate: 0.01,
        };
        let w = [0.2, 0.5, 0.3];

        let analytic = f.gradient(&w);
        let numeric = numerical_gradient(|x| f.value(x), &w, 1e-6);
        for (a, n) in analytic.iter().zip(&numeric) {
            assert_relative_eq!(a, n, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_variance_gradient_matches_finite_differences() {
        let cov = cov();
        let f = Variance { covariance: &cov };
        let w = [0.6, 0.1, 0.3];

        let analytic = f.gradient(&w);
        let numeric = numerical_gradient(|x| f.value(x), &w, 1e-6);
        for (a, n) in analytic.iter().zip(&numeric) {
            assert_relative_eq!(a, n, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sharpe_value_sign() {
        let cov = vec![vec![0.04]];
        let f = NegativeSharpe {
            expected_returns: &[0.1],
            covariance: &cov,
            risk_free_rate: 0.0,
        };
        assert_relative_eq!(f.value(&[1.0]), -0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_objective_for_selects_mode() {
        let cov = vec![vec![0.04]];
        let sharpe = objective_for(ObjectiveMode::Sharpe, &[0.1], &cov, 0.0);
        let variance = objective_for(ObjectiveMode::MinVariance, &[0.1], &cov, 0.0);
        assert!(sharpe.value(&[1.0]) < 0.0);
        assert_relative_eq!(variance.value(&[1.0]), 0.04, epsilon = 1e-15);
    }

    #[test]
    fn test_variance_is_smooth_at_riskless_portfolio() {
        // Perfectly hedged pair: zero variance at equal weights.
        let cov = vec![vec![0.04, -0.04], vec![-0.04, 0.04]];
        let f = Variance { covariance: &cov };
        let w = [0.5, 0.5];

        assert_eq!(f.value(&w), 0.0);
        assert_eq!(f.gradient(&w), vec![0.0, 0.0]);
        let numeric = numerical_gradient(|x| f.value(x), &[0.5 + 1e-7, 0.5 - 1e-7], 1e-6);
        let analytic = f.gradient(&[0.5 + 1e-7, 0.5 - 1e-7]);
        for (a, n) in analytic.iter().zip(&numeric) {
            assert_relative_eq!(a, n, epsilon = 1e-9);
        }
    }
}
