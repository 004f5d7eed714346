//! Sample statistics over series that may contain gaps.
//!
//! Missing observations are encoded as non-finite values (`NaN`). Every
//! function here excludes them: single-series statistics drop the gap,
//! pairwise statistics keep only the periods where both series are finite.
//! All estimators use the unbiased `n - 1` divisor.

use statrs::statistics::Statistics;

use crate::error::{MathError, MathResult};

/// Standard deviation at or below which a series is treated as constant.
pub const ZERO_VARIANCE_EPSILON: f64 = 1e-15;

/// Returns the finite observations of a series, in order.
#[must_use]
pub fn finite_values(xs: &[f64]) -> Vec<f64> {
    xs.iter().copied().filter(|x| x.is_finite()).collect()
}

/// Returns the observations where both series are finite.
#[must_use]
pub fn pairwise_complete(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    xs.iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .unzip()
}

/// Mean of the finite observations.
pub fn mean(xs: &[f64]) -> MathResult<f64> {
    let values = finite_values(xs);
    if values.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    Ok(values.iter().mean())
}

/// Sample standard deviation of the finite observations.
pub fn sample_std_dev(xs: &[f64]) -> MathResult<f64> {
    let values = finite_values(xs);
    if values.len() < 2 {
        return Err(MathError::insufficient_data(2, values.len()));
    }
    Ok(values.iter().std_dev())
}

/// Sample covariance over the pairwise-complete observations.
pub fn pairwise_covariance(xs: &[f64], ys: &[f64]) -> MathResult<f64> {
    let (a, b) = pairwise_complete(xs, ys);
    if a.len() < 2 {
        return Err(MathError::insufficient_data(2, a.len()));
    }
    Ok(a.iter().covariance(b.iter()))
}

/// Pearson correlation over the pairwise-complete observations.
///
/// A constant series has no defined correlation; `0.0` is returned so the
/// result never contains `NaN`.
pub fn pairwise_correlation(xs: &[f64], ys: &[f64]) -> MathResult<f64> {
    let (a, b) = pairwise_complete(xs, ys);
    if a.len() < 2 {
        return Err(MathError::insufficient_data(2, a.len()));
    }

    let sa = a.iter().std_dev();
    let sb = b.iter().std_dev();
    if sa <= ZERO_VARIANCE_EPSILON || sb <= ZERO_VARIANCE_EPSILON {
        return Ok(0.0);
    }

    let cov = a.iter().covariance(b.iter());
    Ok((cov / (sa * sb)).clamp(-1.0, 1.0))
}

/// Sample covariance matrix of column series.
///
/// Each entry uses the observations where both columns are finite, so the
/// diagonal equals the per-column sample variance.
pub fn covariance_matrix(columns: &[Vec<f64>]) -> MathResult<Vec<Vec<f64>>> {
    let n = columns.len();
    let mut cov = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in i..n {
            let c = pairwise_covariance(&columns[i], &columns[j])?;
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }

    Ok(cov)
}

/// Pearson correlation matrix of column series.
///
/// The diagonal is always `1.0`.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> MathResult<Vec<Vec<f64>>> {
    let n = columns.len();
    let mut corr = vec![vec![1.0; n]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let r = pairwise_correlation(&columns[i], &columns[j])?;
            corr[i][j] = r;
            corr[j][i] = r;
        }
    }

    Ok(corr)
}
