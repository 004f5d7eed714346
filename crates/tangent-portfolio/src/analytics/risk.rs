//! Portfolio return, volatility and Sharpe ratio.
//!
//! Shared by the statistics aggregator and the allocation optimizer so both
//! apply the same zero-volatility policy.

use tangent_math::linear_algebra::{dot, is_square, is_symmetric, quadratic_form};
use tangent_math::statistics::ZERO_VARIANCE_EPSILON;

use crate::error::{PortfolioError, PortfolioResult};

/// Portfolio variance, relative to the largest asset variance, at or below
/// which a portfolio counts as riskless.
pub const RISKLESS_VARIANCE_RATIO: f64 = 1e-12;

/// Relative tolerance for covariance symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Equal weights `1/n` for `n` assets.
#[must_use]
pub fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Expected portfolio return `w · mu`.
#[must_use]
pub fn portfolio_return(weights: &[f64], expected_returns: &[f64]) -> f64 {
    dot(weights, expected_returns)
}

/// Portfolio volatility `sqrt(wᵀ Σ w)`.
///
/// Rounding can push the quadratic form of a singular covariance slightly
/// below zero; that is treated as zero variance.
#[must_use]
pub fn portfolio_volatility(weights: &[f64], covariance: &[Vec<f64>]) -> f64 {
    quadratic_form(covariance, weights).max(0.0).sqrt()
}

/// Sharpe ratio `(return - risk_free) / volatility`.
///
/// Returns exactly `0.0` when volatility is zero (at or below
/// [`ZERO_VARIANCE_EPSILON`]) or not finite. A riskless portfolio with
/// positive excess return arguably has an infinite ratio; it is reported as
/// zero so the result never carries `NaN` or `Inf`.
///
/// Volatility just above the threshold is divided through unchanged: a
/// min-variance portfolio on a singular covariance can land at a volatility
/// like `4.4e-10`, which with a few percent of excess return gives a ratio
/// near `3e9`. Callers holding the covariance should screen such portfolios
/// with [`is_riskless`] first, as the aggregator and optimizer do.
#[must_use]
pub fn sharpe_ratio(portfolio_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if !volatility.is_finite() || volatility <= ZERO_VARIANCE_EPSILON {
        return 0.0;
    }
    let ratio = (portfolio_return - risk_free_rate) / volatility;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Returns true if `volatility` is numerical noise relative to the assets'
/// own risk: its variance is at most [`RISKLESS_VARIANCE_RATIO`] times the
/// largest diagonal entry of `covariance`.
///
/// A singular covariance admits fully hedged portfolios whose computed
/// volatility is rounding residue rather than zero. Such a portfolio reaches
/// the lower bound of variance, so a min-variance run that finds one is at
/// its global optimum, and its Sharpe ratio is reported as zero.
#[must_use]
pub fn is_riskless(volatility: f64, covariance: &[Vec<f64>]) -> bool {
    let max_variance = covariance
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.get(i))
        .fold(0.0_f64, |acc, v| acc.max(*v));
    volatility * volatility <= RISKLESS_VARIANCE_RATIO * max_variance
}

/// Sharpe ratio of a portfolio whose volatility came from `covariance`,
/// zero when [`is_riskless`] holds.
#[must_use]
pub fn screened_sharpe_ratio(
    portfolio_return: f64,
    volatility: f64,
    risk_free_rate: f64,
    covariance: &[Vec<f64>],
) -> f64 {
    if is_riskless(volatility, covariance) {
        return 0.0;
    }
    sharpe_ratio(portfolio_return, volatility, risk_free_rate)
}

/// Checks a weight vector against the asset count.
pub fn validate_weights(weights: &[f64], n: usize) -> PortfolioResult<()> {
    if weights.len() != n {
        return Err(PortfolioError::dimension_mismatch("weights", n, weights.len()));
    }
    if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
        return Err(PortfolioError::invalid_weights(format!(
            "weight {i} is not finite"
        )));
    }
    Ok(())
}

/// Checks that `covariance` is a finite, symmetric `n x n` matrix with a
/// non-negative diagonal.
///
/// Positive semi-definiteness is not verified.
pub fn validate_covariance(covariance: &[Vec<f64>], n: usize) -> PortfolioResult<()> {
    if covariance.len() != n {
        return Err(PortfolioError::dimension_mismatch("covariance rows", n, covariance.len()));
    }
    if !is_square(covariance) {
        let bad = covariance.iter().map(Vec::len).find(|len| *len != n).unwrap_or(n);
        return Err(PortfolioError::dimension_mismatch("covariance columns", n, bad));
    }
    if covariance.iter().flatten().any(|c| !c.is_finite()) {
        return Err(PortfolioError::invalid_input("covariance matrix contains non-finite entries"));
    }

    let scale = covariance
        .iter()
        .flatten()
        .fold(1.0_f64, |acc, c| acc.max(c.abs()));
    if !is_symmetric(covariance, SYMMETRY_TOLERANCE * scale) {
        return Err(PortfolioError::invalid_input("covariance matrix is not symmetric"));
    }
    if let Some(i) = (0..n).find(|&i| covariance[i][i] < 0.0) {
        return Err(PortfolioError::invalid_input(format!(
            "covariance diagonal entry {i} is negative"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_portfolio_return_and_volatility() {
        let w = [0.5, 0.5];
        let cov = vec![vec![0.04, 0.01], vec![0.01, 0.09]];
        assert_relative_eq!(portfolio_return(&w, &[0.10, 0.20]), 0.15, epsilon = 1e-15);
        // 0.25 * (0.04 + 0.09 + 2 * 0.01) = 0.0375
        assert_relative_eq!(portfolio_volatility(&w, &cov), 0.0375_f64.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_zero_volatility_sharpe_is_zero() {
        assert_eq!(sharpe_ratio(0.05, 0.0, 0.0), 0.0);
        assert_eq!(sharpe_ratio(0.05, 1e-18, 0.0), 0.0);
        assert_eq!(sharpe_ratio(0.05, f64::NAN, 0.0), 0.0);
        assert_relative_eq!(sharpe_ratio(0.12, 0.2, 0.02), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_near_zero_volatility_is_riskless() {
        let cov = vec![vec![0.04, -0.04], vec![-0.04, 0.04]];

        // Unscreened, rounding residue yields an absurd ratio.
        assert!(sharpe_ratio(1.5, 4.4e-10, 0.0) > 3e9);

        assert!(is_riskless(4.4e-10, &cov));
        assert_eq!(screened_sharpe_ratio(1.5, 4.4e-10, 0.0, &cov), 0.0);
        assert!(!is_riskless(0.01, &cov));
        assert_relative_eq!(
            screened_sharpe_ratio(0.12, 0.2, 0.02, &cov),
            0.5,
            epsilon = 1e-15
        );

        let flat = vec![vec![0.0]];
        assert!(is_riskless(0.0, &flat));
    }

    #[test]
    fn test_negative_rounding_variance_is_zero() {
        let cov = vec![vec![1.0, -1.0], vec![-1.0, 1.0]];
        let vol = portfolio_volatility(&[0.5 + 1e-17, 0.5], &cov);
        assert!(vol.is_finite());
        assert!(vol < 1e-8);
    }

    #[test]
    fn test_validate_weights() {
        assert!(validate_weights(&[0.5, 0.5], 2).is_ok());
        assert!(matches!(
            validate_weights(&[1.0], 2),
            Err(PortfolioError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            validate_weights(&[f64::NAN, 1.0], 2),
            Err(PortfolioError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn test_validate_covariance() {
        let good = vec![vec![0.04, 0.01], vec![0.01, 0.09]];
        assert!(validate_covariance(&good, 2).is_ok());
        assert!(validate_covariance(&good, 3).is_err());

        let ragged = vec![vec![0.04, 0.01], vec![0.01]];
        assert!(validate_covariance(&ragged, 2).is_err());

        let asymmetric = vec![vec![0.04, 0.02], vec![0.01, 0.09]];
        assert!(validate_covariance(&asymmetric, 2).is_err());

        let negative = vec![vec![-0.04, 0.0], vec![0.0, 0.09]];
        assert!(validate_covariance(&negative, 2).is_err());

        let nan = vec![vec![f64::NAN, 0.0], vec![0.0, 0.09]];
        assert!(validate_covariance(&nan, 2).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_equal_weights() {
        assert!(equal_weights(0).is_empty());
        assert_eq!(equal_weights(4), vec![0.25; 4]);
    }
}
