//! Error types for portfolio statistics and allocation.
//!
//! Every variant except [`PortfolioError::Math`] describes an input that was
//! rejected before any numeric work started. Solver non-convergence is not
//! an error; it is reported on the result.

use tangent_math::MathError;
use thiserror::Error;

/// Result type for portfolio operations.
pub type PortfolioResult<T> = Result<T, PortfolioError>;

/// Errors that can occur during portfolio operations.
#[derive(Error, Debug, Clone)]
pub enum PortfolioError {
    /// Generic malformed input.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// The reason the input is invalid.
        reason: String,
    },

    /// Two inputs that must agree in size do not.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being compared.
        what: String,
        /// The expected size.
        expected: usize,
        /// The actual size.
        actual: usize,
    },

    /// No assets to work with.
    #[error("No assets in the universe")]
    EmptyUniverse,

    /// An asset identifier is not a column of the returns table.
    #[error("Unknown asset '{asset}'")]
    UnknownAsset {
        /// The asset identifier.
        asset: String,
    },

    /// Too few finite observations for an asset.
    #[error("Insufficient data for '{asset}': need at least {required} observations, got {actual}")]
    InsufficientData {
        /// The asset identifier.
        asset: String,
        /// Minimum required observations.
        required: usize,
        /// Finite observations available.
        actual: usize,
    },

    /// Weight vector is not usable.
    #[error("Invalid weights: {reason}")]
    InvalidWeights {
        /// The reason the weights are invalid.
        reason: String,
    },

    /// Configuration failed validation.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// Unrecognized objective name.
    #[error("Unknown objective '{name}' (expected 'sharpe' or 'min_variance')")]
    UnknownObjective {
        /// The name that was given.
        name: String,
    },

    /// Failure inside the numerical layer.
    #[error(transparent)]
    Math(#[from] MathError),
}

impl PortfolioError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Create an unknown asset error.
    #[must_use]
    pub fn unknown_asset(asset: impl Into<String>) -> Self {
        Self::UnknownAsset {
            asset: asset.into(),
        }
    }

    /// Create an invalid weights error.
    #[must_use]
    pub fn invalid_weights(reason: impl Into<String>) -> Self {
        Self::InvalidWeights {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns true for errors raised by input validation.
    ///
    /// Constraint sets that admit no weights and malformed numeric inputs
    /// caught by the numerical layer count as invalid input too.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::Math(inner) => matches!(
                inner,
                MathError::InvalidInput { .. }
                    | MathError::InfeasibleConstraints { .. }
                    | MathError::InsufficientData { .. }
                    | MathError::DimensionMismatch { .. }
            ),
            _ => true,
        }
    }
}
