//! # Tangent Math
//!
//! Numerical building blocks for the Tangent portfolio allocation library.
//!
//! This crate provides:
//!
//! - **Statistics**: Sample moments, covariance and correlation over series with gaps
//! - **Optimization**: Constrained minimizers over bounded, fully-invested weight sets
//!   (SQP with damped BFGS, spectral projected gradient)
//! - **Linear Algebra**: Pivoted LU and small dense helpers
//!
//! ## Design Philosophy
//!
//! - **Feasibility First**: Every optimizer iterate satisfies the constraints
//! - **Numerical Stability**: Gaps are dropped, never propagated as `NaN`
//! - **Explicit Failure**: Errors are returned, never panicked

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod linear_algebra;
pub mod optimization;
pub mod statistics;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::optimization::{
        BoxSimplex, ConstrainedMinimizer, FnObjective, Objective, OptimizationConfig,
        OptimizationResult, ProjectedGradientSolver, SqpSolver,
    };
    pub use crate::statistics::{correlation_matrix, covariance_matrix, mean, sample_std_dev};
}

pub use error::{MathError, MathResult};
