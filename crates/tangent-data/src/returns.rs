//! Return derivation and rolling-window statistics.
//!
//! Every derived value is either finite or `NaN`; a period whose inputs are
//! missing, or whose arithmetic overflows, comes out as `NaN`.

use serde::{Deserialize, Serialize};
use tangent_math::statistics::{mean, sample_std_dev};
use tangent_portfolio::ReturnsTable;

use crate::error::{DataError, DataResult};
use crate::prices::PriceTable;

/// Rolling window length used when none is given.
pub const DEFAULT_ROLLING_WINDOW: usize = 20;

// =============================================================================
// RETURNS
// =============================================================================

/// Simple period returns `p_t / p_{t-1} - 1`, one column per symbol.
///
/// The first row is always `NaN`. The date index is carried over.
pub fn simple_returns(prices: &PriceTable) -> DataResult<ReturnsTable> {
    let columns = prices
        .columns()
        .iter()
        .map(|column| {
            std::iter::once(f64::NAN)
                .chain(column.windows(2).map(|pair| finite_or_nan(pair[1] / pair[0] - 1.0)))
                .take(column.len())
                .collect()
        })
        .collect();

    let table = ReturnsTable::from_columns(prices.symbols().to_vec(), columns)?
        .with_dates(prices.dates().to_vec())?;
    Ok(table)
}

/// Log returns `ln(1 + r)` of a simple-returns table.
pub fn log_returns(returns: &ReturnsTable) -> DataResult<ReturnsTable> {
    let columns = returns
        .columns()
        .iter()
        .map(|column| column.iter().map(|r| finite_or_nan(r.ln_1p())).collect())
        .collect();

    let mut table = ReturnsTable::from_columns(returns.assets().to_vec(), columns)?;
    if let Some(dates) = returns.dates() {
        table = table.with_dates(dates.to_vec())?;
    }
    Ok(table)
}

// =============================================================================
// ROLLING STATISTICS
// =============================================================================

/// Trailing mean over `window` periods.
///
/// The first `window - 1` entries, and any window containing a missing
/// value, are `NaN`.
pub fn rolling_mean(series: &[f64], window: usize) -> DataResult<Vec<f64>> {
    rolling(series, window, |w| mean(w).ok())
}

/// Trailing sample standard deviation over `window` periods.
///
/// Same `NaN` policy as [`rolling_mean`]; a window of one period has no
/// sample deviation and is always `NaN`.
pub fn rolling_std(series: &[f64], window: usize) -> DataResult<Vec<f64>> {
    rolling(series, window, |w| sample_std_dev(w).ok())
}

fn rolling<F>(series: &[f64], window: usize, stat: F) -> DataResult<Vec<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return Err(DataError::InvalidWindow(window));
    }

    Ok((0..series.len())
        .map(|end| {
            if end + 1 < window {
                return f64::NAN;
            }
            let slice = &series[end + 1 - window..=end];
            if slice.iter().any(|x| !x.is_finite()) {
                return f64::NAN;
            }
            stat(slice).map_or(f64::NAN, finite_or_nan)
        })
        .collect())
}

/// Rolling mean and standard deviation of one asset's returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    /// Asset identifier.
    pub asset: String,
    /// Window length in periods.
    pub window: usize,
    /// Trailing mean per period.
    pub mean: Vec<f64>,
    /// Trailing sample standard deviation per period.
    pub std_dev: Vec<f64>,
}

/// Rolling statistics for every asset of a returns table.
pub fn rolling_stats(returns: &ReturnsTable, window: usize) -> DataResult<Vec<RollingStats>> {
    returns
        .assets()
        .iter()
        .zip(returns.columns())
        .map(|(asset, column)| {
            Ok(RollingStats {
                asset: asset.clone(),
                window,
                mean: rolling_mean(column, window)?,
                std_dev: rolling_std(column, window)?,
            })
        })
        .collect()
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Everything derived from one price table.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedReturns {
    /// Simple returns; first row `NaN`.
    pub returns: ReturnsTable,
    /// Log returns.
    pub log_returns: ReturnsTable,
    /// Rolling statistics of the simple returns, per asset.
    pub rolling: Vec<RollingStats>,
}

/// Drops dates with any missing price, then derives simple returns, log
/// returns and rolling statistics.
pub fn prepare_returns(prices: &PriceTable, window: usize) -> DataResult<PreparedReturns> {
    let complete = prices.drop_incomplete_rows();
    if complete.num_rows() < 2 {
        return Err(DataError::InvalidTable(format!(
            "need at least 2 complete dates, got {}",
            complete.num_rows()
        )));
    }

    let returns = simple_returns(&complete)?;
    let log_returns = log_returns(&returns)?;
    let rolling = rolling_stats(&returns, window)?;

    tracing::debug!(
        assets = returns.num_assets(),
        periods = returns.num_rows(),
        window,
        "Prepared return series"
    );

    Ok(PreparedReturns {
        returns,
        log_returns,
        rolling,
    })
}

fn finite_or_nan(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        f64::NAN
    }
}
