//! Dated close-price tables.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Date format of the first CSV column. Anything after the date (a time of
/// day, a timezone) is ignored.
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_LEN: usize = 10;

/// Close prices per symbol on a shared, strictly increasing date index.
///
/// A symbol with no price on a date holds `NaN` there, as produced by an
/// outer join of per-symbol histories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Creates a table from a date index and one price column per symbol.
    pub fn new(
        dates: Vec<NaiveDate>,
        symbols: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> DataResult<Self> {
        if symbols.len() != columns.len() {
            return Err(DataError::InvalidTable(format!(
                "{} symbols but {} price columns",
                symbols.len(),
                columns.len()
            )));
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(DataError::InvalidTable(format!("duplicate symbol '{symbol}'")));
            }
        }
        for (symbol, column) in symbols.iter().zip(&columns) {
            if column.len() != dates.len() {
                return Err(DataError::InvalidTable(format!(
                    "'{symbol}' has {} prices for {} dates",
                    column.len(),
                    dates.len()
                )));
            }
        }
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(DataError::InvalidTable(format!(
                "dates not strictly increasing at {}",
                pair[1]
            )));
        }

        Ok(Self {
            dates,
            symbols,
            columns,
        })
    }

    /// Outer-joins per-symbol price histories on date.
    ///
    /// The index is the union of all dates; a symbol missing a date gets `NaN`.
    pub fn from_series(series: Vec<(String, Vec<(NaiveDate, f64)>)>) -> DataResult<Self> {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, points)| points.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut symbols = Vec::with_capacity(series.len());
        let mut columns = Vec::with_capacity(series.len());
        for (symbol, points) in series {
            let mut by_date = BTreeMap::new();
            for (date, price) in points {
                if by_date.insert(date, price).is_some() {
                    return Err(DataError::InvalidTable(format!(
                        "'{symbol}' has two prices on {date}"
                    )));
                }
            }
            columns.push(
                dates
                    .iter()
                    .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                    .collect(),
            );
            symbols.push(symbol);
        }

        Self::new(dates, symbols, columns)
    }

    /// Reads a CSV of the form `Date,SYM1,SYM2,...`.
    ///
    /// Empty cells and `NaN`/`null` are missing prices. Rows may appear in
    /// any order; they are sorted by date.
    pub fn from_csv_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        match headers.get(0) {
            Some(h) if h.eq_ignore_ascii_case("date") => {}
            _ => return Err(DataError::MissingColumn("Date".to_string())),
        }
        let symbols: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, csv::Position::line);

            let raw_date = record.get(0).unwrap_or_default();
            let date_part = raw_date.get(..DATE_LEN).unwrap_or(raw_date);
            let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|e| {
                DataError::ParseError {
                    line,
                    column: "Date".to_string(),
                    reason: format!("'{raw_date}': {e}"),
                }
            })?;

            let mut prices = Vec::with_capacity(symbols.len());
            for (symbol, cell) in symbols.iter().zip(record.iter().skip(1)) {
                prices.push(parse_price(cell).ok_or_else(|| DataError::ParseError {
                    line,
                    column: symbol.clone(),
                    reason: format!("'{cell}' is not a number"),
                })?);
            }
            rows.push((date, prices));
        }

        rows.sort_by_key(|(date, _)| *date);

        let mut columns = vec![Vec::with_capacity(rows.len()); symbols.len()];
        let mut dates = Vec::with_capacity(rows.len());
        for (date, prices) in rows {
            dates.push(date);
            for (column, price) in columns.iter_mut().zip(prices) {
                column.push(price);
            }
        }

        tracing::debug!(symbols = symbols.len(), rows = dates.len(), "Loaded price table");
        Self::new(dates, symbols, columns)
    }

    /// Reads a price CSV from disk.
    pub fn from_path(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| DataError::IoError(format!("{}: {e}", path.display())))?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    /// Date index.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Symbols in column order.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// All price columns in symbol order.
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Prices for `symbol`.
    #[must_use]
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    /// Number of dates.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    /// Returns true if there are no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Returns a copy without any date on which some symbol lacks a price.
    #[must_use]
    pub fn drop_incomplete_rows(&self) -> Self {
        let keep: Vec<usize> = (0..self.num_rows())
            .filter(|&r| self.columns.iter().all(|c| c[r].is_finite()))
            .collect();

        let dropped = self.num_rows() - keep.len();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                remaining = keep.len(),
                "Dropped dates with missing prices"
            );
        }

        Self {
            dates: keep.iter().map(|&r| self.dates[r]).collect(),
            symbols: self.symbols.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&r| c[r]).collect())
                .collect(),
        }
    }
}

fn parse_price(cell: &str) -> Option<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null") {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const CSV: &str = "\
Date,NVDA,MSFT
2024-01-03,100.0,200.0
2024-01-02 00:00:00-05:00,99.0,
2024-01-04,101.5,202.0
";

    #[test]
    fn test_parse_csv() {
        let table = PriceTable::from_csv_reader(CSV.as_bytes()).unwrap();

        assert_eq!(table.symbols(), &["NVDA".to_string(), "MSFT".to_string()]);
        // Sorted by date, time suffix ignored.
        assert_eq!(table.dates()[0], date(2024, 1, 2));
        assert_eq!(table.column("NVDA").unwrap(), &[99.0, 100.0, 101.5]);
        assert!(table.column("MSFT").unwrap()[0].is_nan());
    }

    #[test]
    fn test_drop_incomplete_rows() {
        let table = PriceTable::from_csv_reader(CSV.as_bytes())
            .unwrap()
            .drop_incomplete_rows();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.dates()[0], date(2024, 1, 3));
        assert_eq!(table.column("MSFT").unwrap(), &[200.0, 202.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let missing_date = "Symbol,A\nx,1.0\n";
        assert!(matches!(
            PriceTable::from_csv_reader(missing_date.as_bytes()),
            Err(DataError::MissingColumn(_))
        ));

        let bad_price = "Date,A\n2024-01-02,abc\n";
        let err = PriceTable::from_csv_reader(bad_price.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::ParseError { line: 2, .. }));

        let bad_date = "Date,A\n02/01/2024,1.0\n";
        assert!(PriceTable::from_csv_reader(bad_date.as_bytes()).is_err());

        let duplicate = "Date,A\n2024-01-02,1.0\n2024-01-02,1.1\n";
        assert!(matches!(
            PriceTable::from_csv_reader(duplicate.as_bytes()),
            Err(DataError::InvalidTable(_))
        ));

        let ragged = "Date,A,B\n2024-01-02,1.0\n";
        assert!(matches!(
            PriceTable::from_csv_reader(ragged.as_bytes()),
            Err(DataError::CsvError(_))
        ));
    }

    #[test]
    fn test_outer_join() {
        let table = PriceTable::from_series(vec![
            ("A".into(), vec![(date(2024, 1, 2), 1.0), (date(2024, 1, 3), 1.1)]),
            ("B".into(), vec![(date(2024, 1, 3), 5.0), (date(2024, 1, 4), 5.5)]),
        ])
        .unwrap();

        assert_eq!(table.num_rows(), 3);
        assert!(table.column("A").unwrap()[2].is_nan());
        assert!(table.column("B").unwrap()[0].is_nan());
        assert_eq!(table.drop_incomplete_rows().dates(), &[date(2024, 1, 3)]);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        std::fs::write(&path, CSV).unwrap();

        let table = PriceTable::from_path(&path).unwrap();
        assert_eq!(table.num_rows(), 3);

        assert!(matches!(
            PriceTable::from_path(dir.path().join("missing.csv")),
            Err(DataError::IoError(_))
        ));
    }
}
