//! Allocation optimizer.

use serde::{Deserialize, Serialize};

use super::objectives::objective_for;
use crate::analytics::{
    is_riskless, maybe_parallel_map, portfolio_return, portfolio_volatility, sharpe_ratio,
    validate_covariance, PortfolioMetrics,
};
use crate::error::{PortfolioError, PortfolioResult};
use crate::types::{EngineConfig, ObjectiveMode};

/// Optimal weights and the portfolio they produce.
///
/// Return, volatility and Sharpe ratio are computed on the inputs exactly as
/// given: pass annualized inputs to get annualized figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Optimized weights, inside the configured bounds and summing to one.
    pub weights: Vec<f64>,
    /// Portfolio return `w · mu`.
    pub expected_return: f64,
    /// Portfolio volatility `sqrt(wᵀ Σ w)`.
    pub volatility: f64,
    /// Sharpe ratio at the optimum; `0.0` when the portfolio is riskless
    /// (see [`is_riskless`](crate::analytics::is_riskless)).
    pub sharpe_ratio: f64,
    /// Whether the solver met its tolerance. When false, `weights` is the
    /// best feasible iterate found, not an optimum. A min-variance run that
    /// reaches a riskless portfolio is always converged.
    pub converged: bool,
    /// Solver iterations used.
    pub iterations: u32,
    /// Objective that was optimized.
    pub objective: ObjectiveMode,
    /// Name of the minimizer.
    pub solver: String,
}

impl AllocationResult {
    /// Returns true if the weights are a certified global optimum.
    ///
    /// Only a converged min-variance run qualifies: its objective is convex
    /// over the constraint set. A converged Sharpe run may be a local optimum.
    #[must_use]
    pub fn is_global_optimum(&self) -> bool {
        self.converged && self.objective.is_convex()
    }
}

/// Finds allocation weights that maximize the Sharpe ratio or minimize
/// volatility, subject to `sum(w) == 1` and the configured weight bounds.
///
/// The search starts from equal weights (projected into the bounds when
/// `1/N` is not allowed). Positive semi-definiteness of the covariance is
/// assumed, not checked.
///
/// # Example
///
/// ```rust
/// use tangent_portfolio::prelude::*;
///
/// let optimizer = AllocationOptimizer::default();
/// let cov = vec![vec![0.04, 0.01], vec![0.01, 0.09]];
/// let result = optimizer
///     .optimize(&[0.10, 0.20], &cov, 0.0, ObjectiveMode::Sharpe)
///     .unwrap();
///
/// assert!(result.converged);
/// assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AllocationOptimizer {
    config: EngineConfig,
}

impl AllocationOptimizer {
    /// Creates an optimizer with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Optimizes weights for one objective.
    ///
    /// # Errors
    ///
    /// Input errors are raised before any solver work: an empty universe,
    /// length mismatches between `expected_returns` and `covariance`,
    /// non-finite values, an asymmetric covariance, or bounds that cannot
    /// sum to one. Non-convergence is not an error; see
    /// [`AllocationResult::converged`].
    pub fn optimize(
        &self,
        expected_returns: &[f64],
        covariance: &[Vec<f64>],
        risk_free_rate: f64,
        objective: ObjectiveMode,
    ) -> PortfolioResult<AllocationResult> {
        self.validate_inputs(expected_returns, covariance)?;
        self.solve(expected_returns, covariance, risk_free_rate, objective)
    }

    /// Like [`optimize`](Self::optimize), with the objective given by name
    /// (`"sharpe"` or `"min_variance"`).
    pub fn optimize_named(
        &self,
        expected_returns: &[f64],
        covariance: &[Vec<f64>],
        risk_free_rate: f64,
        method: &str,
    ) -> PortfolioResult<AllocationResult> {
        let objective: ObjectiveMode = method.parse()?;
        self.optimize(expected_returns, covariance, risk_free_rate, objective)
    }

    /// Optimizes on the annualized statistics of a metrics record, using the
    /// configured risk-free rate.
    pub fn optimize_metrics(
        &self,
        metrics: &PortfolioMetrics,
        objective: ObjectiveMode,
    ) -> PortfolioResult<AllocationResult> {
        self.optimize(
            &metrics.mean_returns_annualized,
            &metrics.covariance_annualized,
            self.config.risk_free_rate,
            objective,
        )
    }

    /// Runs one independent optimization per risk-free rate.
    ///
    /// Runs in parallel when the `parallel` feature is enabled and the
    /// scenario count reaches the configured threshold. Results are in the
    /// order of `risk_free_rates`.
    pub fn optimize_scenarios(
        &self,
        expected_returns: &[f64],
        covariance: &[Vec<f64>],
        risk_free_rates: &[f64],
        objective: ObjectiveMode,
    ) -> PortfolioResult<Vec<AllocationResult>> {
        self.validate_inputs(expected_returns, covariance)?;

        tracing::debug!(
            scenarios = risk_free_rates.len(),
            parallel = self.config.should_parallelize(risk_free_rates.len()),
            "Running allocation scenarios"
        );

        maybe_parallel_map(risk_free_rates, &self.config, |rf| {
            self.solve(expected_returns, covariance, *rf, objective)
        })
        .into_iter()
        .collect()
    }

    fn validate_inputs(&self, expected_returns: &[f64], covariance: &[Vec<f64>]) -> PortfolioResult<()> {
        let n = expected_returns.len();
        if n == 0 {
            return Err(PortfolioError::EmptyUniverse);
        }
        if covariance.len() != n {
            return Err(PortfolioError::dimension_mismatch(
                "covariance matrix",
                n,
                covariance.len(),
            ));
        }
        if let Some(i) = expected_returns.iter().position(|m| !m.is_finite()) {
            return Err(PortfolioError::invalid_input(format!(
                "expected return {i} is not finite"
            )));
        }
        validate_covariance(covariance, n)
    }

    fn solve(
        &self,
        expected_returns: &[f64],
        covariance: &[Vec<f64>],
        risk_free_rate: f64,
        objective: ObjectiveMode,
    ) -> PortfolioResult<AllocationResult> {
        if !risk_free_rate.is_finite() {
            return Err(PortfolioError::invalid_input("risk-free rate is not finite"));
        }

        let n = expected_returns.len();
        let constraints = self.config.constraint_set(n)?;
        let start = constraints.equal_weight_start();
        let minimizer = self.config.solver.minimizer();
        let f = objective_for(objective, expected_returns, covariance, risk_free_rate);

        let solution = minimizer.minimize(
            f.as_ref(),
            &start,
            &constraints,
            &self.config.optimization_config(),
        )?;

        let weights = solution.parameters;
        let expected_return = portfolio_return(&weights, expected_returns);
        let volatility = portfolio_volatility(&weights, covariance);
        let riskless = is_riskless(volatility, covariance);
        let sharpe = if riskless {
            0.0
        } else {
            sharpe_ratio(expected_return, volatility, risk_free_rate)
        };
        // Zero variance is a lower bound, so reaching it certifies a minimum
        // even when the solver stalled there.
        let converged =
            solution.converged || (objective == ObjectiveMode::MinVariance && riskless);

        if converged {
            tracing::debug!(
                objective = %objective,
                solver = minimizer.name(),
                iterations = solution.iterations,
                expected_return,
                volatility,
                sharpe,
                "Allocation converged"
            );
        } else {
            tracing::warn!(
                objective = %objective,
                solver = minimizer.name(),
                iterations = solution.iterations,
                "Allocation did not converge; returning best feasible weights"
            );
        }

        Ok(AllocationResult {
            weights,
            expected_return,
            volatility,
            sharpe_ratio: sharpe,
            converged,
            iterations: solution.iterations,
            objective,
            solver: minimizer.name().to_string(),
        })
    }
}

/// Optimizes with the default configuration: long-only, fully invested,
/// SQP solver.
pub fn optimize_portfolio(
    expected_returns: &[f64],
    covariance: &[Vec<f64>],
    risk_free_rate: f64,
    objective: ObjectiveMode,
) -> PortfolioResult<AllocationResult> {
    AllocationOptimizer::default().optimize(expected_returns, covariance, risk_free_rate, objective)
}
