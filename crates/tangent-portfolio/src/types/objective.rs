//! Allocation objectives.

use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;

/// What the allocation optimizer minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Maximize the Sharpe ratio (minimize its negative).
    ///
    /// Not convex in general, so a converged run is a local optimum.
    #[default]
    Sharpe,

    /// Minimize portfolio volatility, ignoring expected returns.
    ///
    /// Convex under the budget and bound constraints, so a converged run is
    /// the global optimum.
    MinVariance,
}

impl ObjectiveMode {
    /// Returns the canonical name of the objective.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe",
            Self::MinVariance => "min_variance",
        }
    }

    /// Returns true if every local optimum of the objective is global.
    #[must_use]
    pub fn is_convex(&self) -> bool {
        matches!(self, Self::MinVariance)
    }
}

impl std::fmt::Display for ObjectiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ObjectiveMode {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharpe" | "max_sharpe" | "max-sharpe" => Ok(Self::Sharpe),
            "min_variance" | "min-variance" | "minvariance" | "min_vol" => Ok(Self::MinVariance),
            _ => Err(PortfolioError::UnknownObjective {
                name: s.to_string(),
            }),
        }
    }
}
