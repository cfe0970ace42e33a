use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;

use super::types::Spread;
use crate::error::Result;
use crate::error::SimError;

/// Evaluates every spread on a `time x assets` frame, giving `time x spreads`.
pub fn calc_spread_mv(prices: ArrayView2<'_, f64>, spreads: &[Spread]) -> Result<Array2<f64>> {
  let (rows, assets) = prices.dim();
  let mut out = Array2::<f64>::zeros((rows, spreads.len()));

  for (spread, mut col) in spreads.iter().zip(out.axis_iter_mut(Axis(1))) {
    if spread.weights.len() > assets {
      return Err(SimError::shape(
        &spread.name,
        format!("at most {assets} weights"),
        spread.weights.len(),
      ));
    }

    col.fill(spread.constant);
    for (w, asset) in spread.weights.iter().zip(prices.axis_iter(Axis(1))) {
      col.scaled_add(*w, &asset);
    }
  }

  Ok(out)
}
