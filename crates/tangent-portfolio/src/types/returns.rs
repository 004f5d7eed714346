//! Returns table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, PortfolioResult};

/// Periodic returns for a set of assets, one column per asset.
///
/// Rows are periods in chronological order; missing observations are `NaN`.
/// Dates are optional: statistics do not depend on them, but preprocessing
/// keeps them so results can be traced back to the sample window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsTable {
    assets: Vec<String>,
    columns: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dates: Option<Vec<NaiveDate>>,
}

impl ReturnsTable {
    /// Creates a table from named columns of equal length.
    pub fn from_columns(assets: Vec<String>, columns: Vec<Vec<f64>>) -> PortfolioResult<Self> {
        if assets.len() != columns.len() {
            return Err(PortfolioError::dimension_mismatch(
                "returns columns",
                assets.len(),
                columns.len(),
            ));
        }

        for (i, name) in assets.iter().enumerate() {
            if assets[..i].contains(name) {
                return Err(PortfolioError::invalid_input(format!(
                    "Duplicate asset column '{name}'"
                )));
            }
        }

        if let Some(first) = columns.first() {
            let rows = first.len();
            for (name, column) in assets.iter().zip(&columns) {
                if column.len() != rows {
                    return Err(PortfolioError::dimension_mismatch(
                        format!("rows of '{name}'"),
                        rows,
                        column.len(),
                    ));
                }
            }
        }

        Ok(Self {
            assets,
            columns,
            dates: None,
        })
    }

    /// Creates a table from row-major data.
    pub fn from_rows(assets: Vec<String>, rows: &[Vec<f64>]) -> PortfolioResult<Self> {
        let n = assets.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); n];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(PortfolioError::dimension_mismatch(format!("row {r}"), n, row.len()));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }
        Self::from_columns(assets, columns)
    }

    /// Attaches a date index, one date per row.
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> PortfolioResult<Self> {
        if dates.len() != self.num_rows() {
            return Err(PortfolioError::dimension_mismatch("dates", self.num_rows(), dates.len()));
        }
        self.dates = Some(dates);
        Ok(self)
    }

    /// Asset identifiers in column order.
    #[must_use]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// All columns in asset order.
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Date index, if one was attached.
    #[must_use]
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Number of asset columns.
    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of periods.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Returns true if the table has no asset columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Returns the column for `asset`.
    #[must_use]
    pub fn column(&self, asset: &str) -> Option<&[f64]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.columns[i].as_slice())
    }

    /// Returns a table restricted to `assets`, in the given order.
    pub fn select<S: AsRef<str>>(&self, assets: &[S]) -> PortfolioResult<Self> {
        let mut names = Vec::with_capacity(assets.len());
        let mut columns = Vec::with_capacity(assets.len());
        for asset in assets {
            let asset = asset.as_ref();
            let column = self
                .column(asset)
                .ok_or_else(|| PortfolioError::unknown_asset(asset))?;
            names.push(asset.to_string());
            columns.push(column.to_vec());
        }

        let mut table = Self::from_columns(names, columns)?;
        table.dates.clone_from(&self.dates);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_from_rows_transposes() {
        let table = ReturnsTable::from_rows(
            names(&["A", "B"]),
            &[vec![0.01, 0.02], vec![0.03, 0.04], vec![f64::NAN, 0.05]],
        )
        .unwrap();

        assert_eq!(table.num_assets(), 2);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column("B").unwrap(), &[0.02, 0.04, 0.05]);
        assert!(table.column("A").unwrap()[2].is_nan());
        assert!(table.column("C").is_none());
    }

    #[test]
    fn test_rejects_ragged_and_duplicate_columns() {
        assert!(ReturnsTable::from_columns(names(&["A", "B"]), vec![vec![0.1], vec![0.1, 0.2]]).is_err());
        assert!(ReturnsTable::from_columns(names(&["A", "A"]), vec![vec![0.1], vec![0.2]]).is_err());
        assert!(ReturnsTable::from_columns(names(&["A"]), vec![]).is_err());
        assert!(ReturnsTable::from_rows(names(&["A", "B"]), &[vec![0.1]]).is_err());
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let table = ReturnsTable::from_columns(
            names(&["A", "B", "C"]),
            vec![vec![1.0], vec![2.0], vec![3.0]],
        )
        .unwrap();

        let picked = table.select(&["C", "A"]).unwrap();
        assert_eq!(picked.assets(), &["C".to_string(), "A".to_string()]);
        assert_eq!(picked.columns(), &[vec![3.0], vec![1.0]]);

        let err = table.select(&["Z"]).unwrap_err();
        assert!(matches!(err, PortfolioError::UnknownAsset { .. }));
    }

    #[test]
    fn test_dates_must_match_rows() {
        let table = ReturnsTable::from_columns(names(&["A"]), vec![vec![0.1, 0.2]]).unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(table.clone().with_dates(vec![d]).is_err());

        let dated = table.with_dates(vec![d, d.succ_opt().unwrap()]).unwrap();
        assert_eq!(dated.dates().unwrap().len(), 2);
    }
}
