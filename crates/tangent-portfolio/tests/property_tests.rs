//! Property-based tests for allocation invariants.
//!
//! These tests verify key mathematical properties that should always hold:
//! - Optimized weights are fully invested and inside their bounds
//! - Min variance is never riskier than equal weight
//! - Min variance weights are invariant to rescaling returns and risk
//! - Default weights equal explicit `1/N` weights
//! - Reported Sharpe ratios are always finite
//! - Singular (low-rank) covariances still optimize to feasible weights

use proptest::prelude::*;
use tangent_portfolio::prelude::*;
use tangent_portfolio::{equal_weights, portfolio_volatility};

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

/// Simple deterministic hash for test data generation.
fn simple_hash(seed: u64, i: u64) -> u64 {
    let mut x = seed.wrapping_add(i).wrapping_mul(0x517cc1b727220a95);
    x ^= x >> 32;
    x = x.wrapping_mul(0x517cc1b727220a95);
    x ^= x >> 32;
    x
}

/// Uniform draw in `[lo, hi)` from the hash.
fn draw(seed: u64, i: u64, lo: f64, hi: f64) -> f64 {
    let unit = (simple_hash(seed, i) % 1_000_000) as f64 / 1_000_000.0;
    lo + unit * (hi - lo)
}

/// Expected returns in 2-20% and a well-conditioned covariance `A Aᵀ + 0.01 I`.
fn generate_inputs(n: usize, seed: u64) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mu = (0..n)
        .map(|i| draw(seed, i as u64, 0.02, 0.20))
        .collect();

    let factors: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|k| draw(seed, 1_000 + (i * n + k) as u64, -0.2, 0.2))
                .collect()
        })
        .collect();

    let mut cov = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let mut c: f64 = (0..n).map(|k| factors[i][k] * factors[j][k]).sum();
            if i == j {
                c += 0.01;
            }
            cov[i][j] = c;
        }
    }
    // Exact symmetry regardless of summation order.
    for i in 0..n {
        for j in 0..i {
            cov[i][j] = cov[j][i];
        }
    }

    (mu, cov)
}

/// Expected returns in 2-20% and a singular covariance `F Fᵀ` with `F` of
/// shape `n x rank`.
fn generate_low_rank(n: usize, rank: usize, seed: u64) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mu = (0..n)
        .map(|i| draw(seed, i as u64, 0.02, 0.20))
        .collect();

    let factors: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..rank)
                .map(|k| draw(seed, 5_000 + (i * rank + k) as u64, -0.2, 0.2))
                .collect()
        })
        .collect();

    let mut cov = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let c: f64 = (0..rank).map(|k| factors[i][k] * factors[j][k]).sum();
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }

    (mu, cov)
}

/// Periodic returns with `rows` observations per asset.
fn generate_returns(n: usize, rows: usize, seed: u64) -> ReturnsTable {
    let names = (0..n).map(|i| format!("A{i}")).collect();
    let columns = (0..n)
        .map(|i| {
            (0..rows)
                .map(|t| draw(seed, (i * rows + t) as u64, -0.03, 0.035))
                .collect()
        })
        .collect();
    ReturnsTable::from_columns(names, columns).unwrap()
}

fn assert_fully_invested(weights: &[f64], context: &str) {
    let total: f64 = weights.iter().sum();
    assert!(
        (total - 1.0).abs() < 1e-6,
        "Weights should sum to 1, got {total} ({context})"
    );
    for w in weights {
        assert!(
            (-1e-9..=1.0 + 1e-9).contains(w),
            "Weight {w} outside [0, 1] ({context})"
        );
    }
}

// =============================================================================
// PROPERTY: WEIGHTS ON THE SIMPLEX
// =============================================================================

#[test]
fn property_weights_fully_invested_and_long_only() {
    for solver in [SolverChoice::Sqp, SolverChoice::ProjectedGradient] {
        let optimizer = AllocationOptimizer::new(EngineConfig::default().with_solver(solver));

        for seed in 0..8 {
            for size in [2, 3, 5, 8] {
                let (mu, cov) = generate_inputs(size, seed);
                for mode in [ObjectiveMode::Sharpe, ObjectiveMode::MinVariance] {
                    let result = optimizer.optimize(&mu, &cov, 0.01, mode).unwrap();
                    assert_fully_invested(
                        &result.weights,
                        &format!("solver={solver:?}, mode={mode}, size={size}, seed={seed}"),
                    );
                }
            }
        }
    }
}

#[test]
fn property_weights_respect_caps() {
    let config = EngineConfig::default().with_weight_bounds(WeightBounds::Uniform {
        min: 0.05,
        max: 0.4,
    });
    let optimizer = AllocationOptimizer::new(config);

    for seed in 0..8 {
        let (mu, cov) = generate_inputs(5, seed);
        let result = optimizer
            .optimize(&mu, &cov, 0.0, ObjectiveMode::Sharpe)
            .unwrap();

        assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        for w in &result.weights {
            assert!(
                (0.05..=0.4).contains(w),
                "Weight {w} outside [0.05, 0.4] for seed={seed}"
            );
        }
    }
}

// =============================================================================
// PROPERTY: MIN VARIANCE BEATS EQUAL WEIGHT
// =============================================================================

#[test]
fn property_min_variance_not_riskier_than_equal_weight() {
    for seed in 0..10 {
        for size in [2, 4, 6, 10] {
            let (mu, cov) = generate_inputs(size, seed);
            let result = optimize_portfolio(&mu, &cov, 0.0, ObjectiveMode::MinVariance).unwrap();
            let equal = portfolio_volatility(&equal_weights(size), &cov);

            assert!(
                result.volatility <= equal + 1e-9,
                "Min variance {} above equal weight {} for size={size}, seed={seed}",
                result.volatility,
                equal
            );
        }
    }
}

// =============================================================================
// PROPERTY: SINGULAR COVARIANCE
// =============================================================================

#[test]
fn property_low_rank_covariance_optimizes() {
    for solver in [SolverChoice::Sqp, SolverChoice::ProjectedGradient] {
        let optimizer = AllocationOptimizer::new(
            EngineConfig::default()
                .with_solver(solver)
                .with_max_iterations(5000),
        );

        for seed in 0..10 {
            for (size, rank) in [(40, 5), (12, 3), (6, 1)] {
                let (mu, cov) = generate_low_rank(size, rank, seed);
                let equal = portfolio_volatility(&equal_weights(size), &cov);
                let context = format!("solver={solver:?}, size={size}, rank={rank}, seed={seed}");

                let sharpe = optimizer
                    .optimize(&mu, &cov, 0.02, ObjectiveMode::Sharpe)
                    .unwrap_or_else(|e| panic!("max Sharpe failed: {e} ({context})"));
                assert_fully_invested(&sharpe.weights, &context);
                assert!(sharpe.sharpe_ratio.is_finite(), "{context}");
                assert!(sharpe.volatility.is_finite(), "{context}");

                let min_var = optimizer
                    .optimize(&mu, &cov, 0.02, ObjectiveMode::MinVariance)
                    .unwrap_or_else(|e| panic!("min variance failed: {e} ({context})"));
                assert_fully_invested(&min_var.weights, &context);
                assert!(min_var.converged, "min variance did not converge ({context})");
                assert!(min_var.is_global_optimum(), "{context}");
                assert!(
                    min_var.volatility <= equal + 1e-9,
                    "Min variance {} above equal weight {equal} ({context})",
                    min_var.volatility
                );
            }
        }
    }
}

// =============================================================================
// PROPERTY: SCALE INVARIANCE
// =============================================================================

#[test]
fn property_min_variance_scale_invariant() {
    for seed in 0..6 {
        let (mu, cov) = generate_inputs(4, seed);
        let base = optimize_portfolio(&mu, &cov, 0.0, ObjectiveMode::MinVariance).unwrap();

        for k in [2.0_f64, 0.5, 10.0] {
            let mu_k: Vec<f64> = mu.iter().map(|m| m * k).collect();
            let cov_k: Vec<Vec<f64>> = cov
                .iter()
                .map(|row| row.iter().map(|c| c * k * k).collect())
                .collect();
            let scaled =
                optimize_portfolio(&mu_k, &cov_k, 0.0, ObjectiveMode::MinVariance).unwrap();

            for (a, b) in base.weights.iter().zip(&scaled.weights) {
                assert!(
                    (a - b).abs() < 1e-4,
                    "Weights moved under scale k={k}: {a} vs {b} (seed={seed})"
                );
            }
            assert!((scaled.volatility - k * base.volatility).abs() < 1e-4 * k);
        }
    }
}

// =============================================================================
// PROPERTY: AGGREGATOR DEFAULTS
// =============================================================================

#[test]
fn property_default_weights_equal_explicit() {
    let config = EngineConfig::default();

    for seed in 0..10 {
        for size in [1, 2, 5, 12] {
            let returns = generate_returns(size, 60, seed);
            let explicit = vec![1.0 / size as f64; size];

            let implicit_metrics = compute_metrics(&returns, None, &config).unwrap();
            let explicit_metrics = compute_metrics(&returns, Some(&explicit), &config).unwrap();

            assert_eq!(
                implicit_metrics, explicit_metrics,
                "Default weights differ from 1/N for size={size}, seed={seed}"
            );
        }
    }
}

// =============================================================================
// RANDOMIZED PROPERTIES
// =============================================================================

fn returns_strategy() -> impl Strategy<Value = ReturnsTable> {
    (2usize..6, 12usize..48).prop_flat_map(|(n, rows)| {
        prop::collection::vec(prop::collection::vec(-0.05f64..0.05, rows), n).prop_map(
            move |columns| {
                let names = (0..n).map(|i| format!("A{i}")).collect();
                ReturnsTable::from_columns(names, columns).unwrap()
            },
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_metrics_and_allocation_finite(
        returns in returns_strategy(),
        rf in 0.0f64..0.05,
    ) {
        let config = EngineConfig::default().with_risk_free_rate(rf);
        let metrics = compute_metrics(&returns, None, &config).unwrap();

        prop_assert!(metrics.annualized_return.is_finite());
        prop_assert!(metrics.annualized_risk >= 0.0);
        prop_assert!(metrics.sharpe_ratio.is_finite());
        for i in 0..metrics.num_assets() {
            prop_assert!((metrics.correlation[i][i] - 1.0).abs() < 1e-12);
        }

        let optimizer = AllocationOptimizer::new(config);
        for mode in [ObjectiveMode::Sharpe, ObjectiveMode::MinVariance] {
            let result = optimizer.optimize_metrics(&metrics, mode).unwrap();
            let total: f64 = result.weights.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-6);
            prop_assert!(result.weights.iter().all(|w| (-1e-9..=1.0 + 1e-9).contains(w)));
            prop_assert!(result.sharpe_ratio.is_finite());
            prop_assert!(result.volatility.is_finite());
        }
    }

    #[test]
    fn prop_min_variance_not_riskier_than_equal_weight(returns in returns_strategy()) {
        let config = EngineConfig::default();
        let metrics = compute_metrics(&returns, None, &config).unwrap();
        let result = AllocationOptimizer::new(config)
            .optimize_metrics(&metrics, ObjectiveMode::MinVariance)
            .unwrap();

        prop_assert!(result.volatility <= metrics.annualized_risk + 1e-9);
    }
}
