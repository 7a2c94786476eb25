//! Conversions from row-oriented inputs to the matrices the posterior works on,
//! plus the validation shared by every entry point.

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Builds an N × D feature matrix from row vectors.
///
/// An empty slice yields a 0 × 0 matrix.
///
/// # Errors
///
/// Returns `Error::DimensionMismatch` if the rows have different lengths, or
/// `Error::NonFinite` if any entry is `NaN` or infinite.
pub fn features_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    matrix_from_rows("features", rows)
}

/// Builds an N × P target matrix from row vectors.
///
/// # Errors
///
/// Same as [`features_from_rows`].
pub fn targets_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    matrix_from_rows("targets", rows)
}

/// Builds an N × 1 target matrix from scalar targets.
///
/// # Errors
///
/// Returns `Error::NonFinite` if any value is `NaN` or infinite.
pub fn targets_from_values(values: &[f64]) -> Result<DMatrix<f64>> {
    let m = DMatrix::from_column_slice(values.len(), 1, values);
    check_finite("targets", &m)?;
    Ok(m)
}

fn matrix_from_rows(name: &'static str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let n_cols = rows.first().map_or(0, Vec::len);
    for row in rows {
        if row.len() != n_cols {
            return Err(Error::DimensionMismatch {
                what: name,
                expected: n_cols,
                got: row.len(),
            });
        }
    }
    let m = DMatrix::from_fn(rows.len(), n_cols, |i, j| rows[i][j]);
    check_finite(name, &m)?;
    Ok(m)
}

/// Rejects matrices with `NaN` or infinite entries.
pub(crate) fn check_finite(name: &'static str, m: &DMatrix<f64>) -> Result<()> {
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            let value = m[(i, j)];
            if !value.is_finite() {
                return Err(Error::NonFinite {
                    name,
                    row: i,
                    col: j,
                    value,
                });
            }
        }
    }
    Ok(())
}

/// Rejects slices with `NaN` or infinite entries, reporting them as row `row`.
pub(crate) fn check_finite_row(name: &'static str, row: usize, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(col) => Err(Error::NonFinite {
            name,
            row,
            col,
            value: values[col],
        }),
        None => Ok(()),
    }
}

/// Copies the rows of `m` into contiguous vectors for kernel evaluation.
pub(crate) fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|r| r.iter().copied().collect())
        .collect()
}

/// Returns `m` with `row` appended as a new last row.
pub(crate) fn append_row(m: &DMatrix<f64>, row: &[f64]) -> DMatrix<f64> {
    let n = m.nrows();
    DMatrix::from_fn(n + 1, m.ncols(), |i, j| if i < n { m[(i, j)] } else { row[j] })
}
