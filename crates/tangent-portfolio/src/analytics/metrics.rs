//! Statistics aggregator.
//!
//! Turns a table of periodic per-asset returns into annualized
//! portfolio-level risk and return figures.
//!
//! ## Annualization
//!
//! With `p` periods per year and i.i.d. periodic returns:
//!
//! ```text
//! annual mean = periodic mean * p
//! annual std  = periodic std  * sqrt(p)
//! annual cov  = periodic cov  * p
//! ```
//!
//! Correlation is scale-invariant and reported on the periodic data.

use serde::{Deserialize, Serialize};
use tangent_math::statistics::{self, pairwise_complete};

use super::risk::{
    equal_weights, portfolio_return, portfolio_volatility, screened_sharpe_ratio, validate_weights,
};
use crate::error::{PortfolioError, PortfolioResult};
use crate::types::{EngineConfig, ReturnsTable};

/// Fewest finite observations that give a sample standard deviation.
const MIN_OBSERVATIONS: usize = 2;

/// Portfolio statistics for one returns sample and weight vector.
///
/// All vectors are in [`PortfolioMetrics::assets`] order. Returns and
/// volatilities are decimal fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Asset identifiers.
    pub assets: Vec<String>,
    /// Annualization factor used.
    pub periods_per_year: u32,
    /// Annualized portfolio return `w · mu_annual`.
    pub annualized_return: f64,
    /// Annualized portfolio volatility `sqrt(wᵀ Σ_annual w)`.
    pub annualized_risk: f64,
    /// Sharpe ratio against the configured risk-free rate; `0.0` when risk is zero.
    pub sharpe_ratio: f64,
    /// Mean periodic return per asset.
    pub mean_returns_periodic: Vec<f64>,
    /// Annualized mean return per asset.
    pub mean_returns_annualized: Vec<f64>,
    /// Periodic sample standard deviation per asset.
    pub std_dev_periodic: Vec<f64>,
    /// Annualized standard deviation per asset.
    pub std_dev_annualized: Vec<f64>,
    /// Weights used.
    pub weights: Vec<f64>,
    /// Annualized sample covariance matrix.
    pub covariance_annualized: Vec<Vec<f64>>,
    /// Correlation matrix of periodic returns.
    pub correlation: Vec<Vec<f64>>,
    /// Finite observations per asset.
    pub observations: Vec<usize>,
}

impl PortfolioMetrics {
    /// Number of assets.
    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Weight of `asset`, if present.
    #[must_use]
    pub fn weight_of(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.weights[i])
    }
}

/// Computes portfolio metrics over every column of `returns`.
///
/// When `weights` is `None`, each asset gets `1/N`. Weights need not sum to
/// one; they must match the column count and be finite.
///
/// # Errors
///
/// - [`PortfolioError::EmptyUniverse`] if the table has no asset columns
/// - [`PortfolioError::DimensionMismatch`] if `weights` has the wrong length
/// - [`PortfolioError::InsufficientData`] if an asset, or a pair of assets,
///   has fewer than two finite observations
pub fn compute_metrics(
    returns: &ReturnsTable,
    weights: Option<&[f64]>,
    config: &EngineConfig,
) -> PortfolioResult<PortfolioMetrics> {
    config.validate()?;

    let n = returns.num_assets();
    if n == 0 {
        return Err(PortfolioError::EmptyUniverse);
    }

    let weights = match weights {
        Some(w) => {
            validate_weights(w, n)?;
            w.to_vec()
        }
        None => equal_weights(n),
    };

    let assets = returns.assets();
    let columns = returns.columns();

    let mut observations = Vec::with_capacity(n);
    let mut mean_periodic = Vec::with_capacity(n);
    let mut std_periodic = Vec::with_capacity(n);
    for (asset, column) in assets.iter().zip(columns) {
        let count = column.iter().filter(|x| x.is_finite()).count();
        if count < MIN_OBSERVATIONS {
            return Err(PortfolioError::InsufficientData {
                asset: asset.clone(),
                required: MIN_OBSERVATIONS,
                actual: count,
            });
        }
        observations.push(count);
        mean_periodic.push(statistics::mean(column)?);
        std_periodic.push(statistics::sample_std_dev(column)?);
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let overlap = pairwise_complete(&columns[i], &columns[j]).0.len();
            if overlap < MIN_OBSERVATIONS {
                return Err(PortfolioError::InsufficientData {
                    asset: format!("{}/{}", assets[i], assets[j]),
                    required: MIN_OBSERVATIONS,
                    actual: overlap,
                });
            }
        }
    }

    let periods = f64::from(config.periods_per_year);
    let mean_annual: Vec<f64> = mean_periodic.iter().map(|m| m * periods).collect();
    let std_annual: Vec<f64> = std_periodic.iter().map(|s| s * periods.sqrt()).collect();

    let covariance_annualized: Vec<Vec<f64>> = statistics::covariance_matrix(columns)?
        .into_iter()
        .map(|row| row.into_iter().map(|c| c * periods).collect())
        .collect();
    let correlation = statistics::correlation_matrix(columns)?;

    let annualized_return = portfolio_return(&weights, &mean_annual);
    let annualized_risk = portfolio_volatility(&weights, &covariance_annualized);
    let sharpe = screened_sharpe_ratio(
        annualized_return,
        annualized_risk,
        config.risk_free_rate,
        &covariance_annualized,
    );

    tracing::debug!(
        assets = n,
        rows = returns.num_rows(),
        annualized_return,
        annualized_risk,
        sharpe,
        "Computed portfolio metrics"
    );

    Ok(PortfolioMetrics {
        assets: assets.to_vec(),
        periods_per_year: config.periods_per_year,
        annualized_return,
        annualized_risk,
        sharpe_ratio: sharpe,
        mean_returns_periodic: mean_periodic,
        mean_returns_annualized: mean_annual,
        std_dev_periodic: std_periodic,
        std_dev_annualized: std_annual,
        weights,
        covariance_annualized,
        correlation,
        observations,
    })
}

/// Computes portfolio metrics over an explicit list of asset columns.
///
/// Columns not named in `assets` are ignored, so derived series kept in the
/// same table never leak into the statistics. Weights follow `assets` order.
pub fn compute_metrics_for_assets<S: AsRef<str>>(
    returns: &ReturnsTable,
    assets: &[S],
    weights: Option<&[f64]>,
    config: &EngineConfig,
) -> PortfolioResult<PortfolioMetrics> {
    compute_metrics(&returns.select(assets)?, weights, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> ReturnsTable {
        ReturnsTable::from_columns(
            vec!["A".into(), "B".into()],
            vec![
                vec![f64::NAN, 0.01, -0.02, 0.015, 0.005],
                vec![f64::NAN, 0.02, 0.01, -0.01, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_annualization() {
        let config = EngineConfig::default();
        let m = compute_metrics(&table(), None, &config).unwrap();

        let mean_a = (0.01 - 0.02 + 0.015 + 0.005) / 4.0;
        assert_relative_eq!(m.mean_returns_periodic[0], mean_a, epsilon = 1e-15);
        assert_relative_eq!(m.mean_returns_annualized[0], mean_a * 252.0, epsilon = 1e-12);
        assert_relative_eq!(
            m.std_dev_annualized[1],
            m.std_dev_periodic[1] * 252.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            m.covariance_annualized[0][0],
            m.std_dev_periodic[0].powi(2) * 252.0,
            epsilon = 1e-12
        );
        assert_eq!(m.observations, vec![4, 4]);
        assert_eq!(m.weights, vec![0.5, 0.5]);
    }

    #[test]
    fn test_periods_per_year_is_configurable() {
        let daily = compute_metrics(&table(), None, &EngineConfig::default()).unwrap();
        let monthly =
            compute_metrics(&table(), None, &EngineConfig::default().with_periods_per_year(12)).unwrap();

        assert_relative_eq!(
            monthly.annualized_return / daily.annualized_return,
            12.0 / 252.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            monthly.annualized_risk / daily.annualized_risk,
            (12.0_f64 / 252.0).sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(monthly.correlation, daily.correlation);
    }

    #[test]
    fn test_portfolio_figures_use_weights() {
        let config = EngineConfig::default();
        let w = [0.8, 0.2];
        let m = compute_metrics(&table(), Some(&w), &config).unwrap();

        let expected_return = 0.8 * m.mean_returns_annualized[0] + 0.2 * m.mean_returns_annualized[1];
        assert_relative_eq!(m.annualized_return, expected_return, epsilon = 1e-12);
        assert_relative_eq!(m.sharpe_ratio, m.annualized_return / m.annualized_risk, epsilon = 1e-12);
        assert_eq!(m.weight_of("A"), Some(0.8));
        assert_eq!(m.weight_of("Z"), None);
    }

    #[test]
    fn test_risk_free_rate_shifts_sharpe() {
        let base = compute_metrics(&table(), None, &EngineConfig::default()).unwrap();
        let shifted =
            compute_metrics(&table(), None, &EngineConfig::default().with_risk_free_rate(0.02)).unwrap();
        assert_relative_eq!(
            shifted.sharpe_ratio,
            (base.annualized_return - 0.02) / base.annualized_risk,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_variance_asset() {
        let flat = ReturnsTable::from_columns(
            vec!["CASH".into(), "A".into()],
            vec![vec![0.0, 0.0, 0.0], vec![0.01, -0.01, 0.02]],
        )
        .unwrap();

        let m = compute_metrics(&flat, Some(&[1.0, 0.0]), &EngineConfig::default()).unwrap();
        assert_eq!(m.annualized_risk, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.correlation[0][0], 1.0);
        assert_eq!(m.correlation[0][1], 0.0);
    }

    #[test]
    fn test_input_errors() {
        let config = EngineConfig::default();
        let empty = ReturnsTable::from_columns(vec![], vec![]).unwrap();
        assert!(matches!(
            compute_metrics(&empty, None, &config),
            Err(PortfolioError::EmptyUniverse)
        ));

        assert!(matches!(
            compute_metrics(&table(), Some(&[1.0]), &config),
            Err(PortfolioError::DimensionMismatch { .. })
        ));

        let short = ReturnsTable::from_columns(vec!["A".into()], vec![vec![f64::NAN, 0.01]]).unwrap();
        assert!(matches!(
            compute_metrics(&short, None, &config),
            Err(PortfolioError::InsufficientData { actual: 1, .. })
        ));

        // Each column has two points, but they never overlap.
        let disjoint = ReturnsTable::from_columns(
            vec!["A".into(), "B".into()],
            vec![
                vec![0.01, 0.02, f64::NAN, f64::NAN],
                vec![f64::NAN, f64::NAN, 0.01, 0.03],
            ],
        )
        .unwrap();
        let err = compute_metrics(&disjoint, None, &config).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_explicit_asset_list() {
        let wide = ReturnsTable::from_columns(
            vec!["A".into(), "Log Returns (A)".into(), "B".into()],
            vec![
                vec![0.01, -0.02, 0.015],
                vec![0.00995, -0.0202, 0.0149],
                vec![0.02, 0.01, -0.01],
            ],
        )
        .unwrap();

        let m = compute_metrics_for_assets(&wide, &["A", "B"], None, &EngineConfig::default()).unwrap();
        assert_eq!(m.assets, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(m.num_assets(), 2);

        assert!(matches!(
            compute_metrics_for_assets(&wide, &["C"], None, &EngineConfig::default()),
            Err(PortfolioError::UnknownAsset { .. })
        ));
    }
}
