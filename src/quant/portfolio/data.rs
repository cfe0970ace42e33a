//! # Portfolio Data Utilities
//!
//! $$
//! \rho_{ij} = \frac{\operatorname{cov}(r_i, r_j)}{\sigma_i \sigma_j}
//! $$
//!
//! Correlation and volatility estimates from `time x assets` return frames.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use crate::error::Result;
use crate::error::SimError;

/// Pearson correlation between the columns of `returns`.
pub fn correlation_matrix(returns: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
  if returns.nrows() < 2 {
    return Err(SimError::InsufficientData {
      required: 2,
      provided: returns.nrows(),
    });
  }

  let cor = returns
    .t()
    .pearson_correlation()
    .map_err(|e| SimError::Numerical(e.to_string()))?;
  if cor.iter().any(|v| !v.is_finite()) {
    return Err(SimError::Numerical(
      "correlation undefined for a constant return series".into(),
    ));
  }

  Ok(cor)
}

/// Per-column sample volatility scaled to one year.
pub fn annualized_volatility(returns: ArrayView2<'_, f64>, dt: f64) -> Result<Array1<f64>> {
  if returns.nrows() < 2 {
    return Err(SimError::InsufficientData {
      required: 2,
      provided: returns.nrows(),
    });
  }
  Ok(returns.std_axis(Axis(0), 1.0) * (1.0 / dt).sqrt())
}
