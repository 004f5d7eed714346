//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tangent_math::optimization::{
    BoxSimplex, ConstrainedMinimizer, OptimizationConfig, ProjectedGradientSolver, SqpSolver,
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE,
};

use crate::error::{PortfolioError, PortfolioResult};

/// Trading periods per year for daily data.
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

/// Slack on the budget feasibility check for bounds.
const BOUNDS_SLACK: f64 = 1e-12;

/// Per-asset weight limits.
///
/// Serialized untagged: `{ min = 0.0, max = 0.4 }` for uniform bounds, or a
/// list of `[min, max]` pairs in asset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightBounds {
    /// The same bounds for every asset.
    Uniform {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// One `(min, max)` pair per asset.
    PerAsset(Vec<(f64, f64)>),
}

impl WeightBounds {
    /// Long-only, no leverage: every weight in `[0, 1]`.
    #[must_use]
    pub fn long_only() -> Self {
        Self::Uniform { min: 0.0, max: 1.0 }
    }

    /// Expands to lower and upper bound vectors for `n` assets.
    pub fn expand(&self, n: usize) -> PortfolioResult<(Vec<f64>, Vec<f64>)> {
        match self {
            Self::Uniform { min, max } => Ok((vec![*min; n], vec![*max; n])),
            Self::PerAsset(pairs) => {
                if pairs.len() != n {
                    return Err(PortfolioError::dimension_mismatch("weight bounds", n, pairs.len()));
                }
                Ok(pairs.iter().copied().unzip())
            }
        }
    }

    fn pairs(&self) -> Vec<(f64, f64)> {
        match self {
            Self::Uniform { min, max } => vec![(*min, *max)],
            Self::PerAsset(pairs) => pairs.clone(),
        }
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self::long_only()
    }
}

/// Constrained minimizer used by the allocation optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverChoice {
    /// Sequential quadratic programming with damped BFGS.
    #[default]
    Sqp,
    /// Spectral projected gradient.
    ProjectedGradient,
}

impl SolverChoice {
    /// Returns the minimizer for this choice.
    #[must_use]
    pub fn minimizer(&self) -> Box<dyn ConstrainedMinimizer> {
        match self {
            Self::Sqp => Box::new(SqpSolver::new()),
            Self::ProjectedGradient => Box::new(ProjectedGradientSolver::default()),
        }
    }
}

/// Configuration for the statistics aggregator and allocation optimizer.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// periods_per_year = 52
/// allow_short = true
/// solver = "projected_gradient"
///
/// [weight_bounds]
/// min = -0.25
/// max = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Periods per year used to annualize (252 daily, 52 weekly, 12 monthly).
    pub periods_per_year: u32,

    /// Permit negative weights.
    pub allow_short: bool,

    /// Risk-free rate for the aggregator's Sharpe ratio, as a decimal fraction.
    pub risk_free_rate: f64,

    /// Minimizer used by the optimizer.
    pub solver: SolverChoice,

    /// Solver convergence tolerance.
    pub tolerance: f64,

    /// Solver iteration budget.
    pub max_iterations: u32,

    /// Enable parallel scenario runs (requires 'parallel' feature).
    pub parallel: bool,

    /// Minimum scenario count to trigger parallel processing.
    /// Below this threshold, sequential is faster due to thread overhead.
    pub parallel_threshold: usize,

    /// Explicit weight bounds. When absent, `[0, 1]` long-only or `[-1, 1]`
    /// with shorting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_bounds: Option<WeightBounds>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            allow_short: false,
            risk_free_rate: 0.0,
            solver: SolverChoice::Sqp,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel: true,
            parallel_threshold: 8,
            weight_bounds: None,
        }
    }
}

impl EngineConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config that always runs scenarios sequentially.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Sets the annualization factor.
    #[must_use]
    pub fn with_periods_per_year(mut self, periods: u32) -> Self {
        self.periods_per_year = periods;
        self
    }

    /// Sets whether short positions are allowed.
    #[must_use]
    pub fn with_allow_short(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }

    /// Sets explicit weight bounds.
    #[must_use]
    pub fn with_weight_bounds(mut self, bounds: WeightBounds) -> Self {
        self.weight_bounds = Some(bounds);
        self
    }

    /// Sets the risk-free rate.
    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Sets the minimizer.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverChoice) -> Self {
        self.solver = solver;
        self
    }

    /// Sets the solver tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the solver iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets whether to use parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Sets the threshold for parallel processing.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Returns true if parallel processing should be used for the given count.
    #[must_use]
    pub fn should_parallelize(&self, count: usize) -> bool {
        cfg!(feature = "parallel") && self.parallel && count >= self.parallel_threshold
    }

    /// Weight bounds in effect, filling in the default for the short-selling mode.
    #[must_use]
    pub fn effective_bounds(&self) -> WeightBounds {
        match (&self.weight_bounds, self.allow_short) {
            (Some(bounds), _) => bounds.clone(),
            (None, false) => WeightBounds::long_only(),
            (None, true) => WeightBounds::Uniform { min: -1.0, max: 1.0 },
        }
    }

    /// Solver settings derived from this config.
    #[must_use]
    pub fn optimization_config(&self) -> OptimizationConfig {
        OptimizationConfig::default()
            .with_tolerance(self.tolerance)
            .with_max_iterations(self.max_iterations)
    }

    /// Builds the fully-invested constraint set for `n` assets.
    pub fn constraint_set(&self, n: usize) -> PortfolioResult<BoxSimplex> {
        if n == 0 {
            return Err(PortfolioError::EmptyUniverse);
        }
        self.validate()?;
        let (lower, upper) = self.effective_bounds().expand(n)?;
        Ok(BoxSimplex::new(lower, upper, 1.0)?)
    }

    /// Checks the configuration for values no computation can use.
    pub fn validate(&self) -> PortfolioResult<()> {
        if self.periods_per_year == 0 {
            return Err(PortfolioError::invalid_config("periods_per_year must be positive"));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(PortfolioError::invalid_config("risk_free_rate must be finite"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(PortfolioError::invalid_config("tolerance must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(PortfolioError::invalid_config("max_iterations must be positive"));
        }

        let bounds = self.effective_bounds();
        for (i, (min, max)) in bounds.pairs().into_iter().enumerate() {
            if !min.is_finite() || !max.is_finite() {
                return Err(PortfolioError::invalid_config(format!(
                    "weight bounds at {i} must be finite"
                )));
            }
            if min > max {
                return Err(PortfolioError::invalid_config(format!(
                    "weight bounds at {i}: min {min} exceeds max {max}"
                )));
            }
            if min < 0.0 && !self.allow_short {
                return Err(PortfolioError::invalid_config(format!(
                    "weight bounds at {i}: negative min {min} requires allow_short"
                )));
            }
        }

        match &bounds {
            WeightBounds::Uniform { min, max } => {
                // Some universe size must be able to reach full investment.
                if *max <= 0.0 || *min > 1.0 {
                    return Err(PortfolioError::invalid_config(format!(
                        "uniform bounds [{min}, {max}] cannot sum to 1"
                    )));
                }
            }
            WeightBounds::PerAsset(pairs) => {
                let lower: f64 = pairs.iter().map(|p| p.0).sum();
                let upper: f64 = pairs.iter().map(|p| p.1).sum();
                if lower > 1.0 + BOUNDS_SLACK || upper < 1.0 - BOUNDS_SLACK {
                    return Err(PortfolioError::invalid_config(format!(
                        "per-asset bounds sum to [{lower}, {upper}], which excludes 1"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(s: &str) -> PortfolioResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| PortfolioError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> PortfolioResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PortfolioError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serializes to TOML.
    pub fn to_toml_string(&self) -> PortfolioResult<String> {
        toml::to_string(self).map_err(|e| PortfolioError::invalid_config(e.to_string()))
    }
}
