//! # Series
//!
//! $$
//! r_t = \ln\frac{p_t}{p_{t-1}}
//! $$
//!
use ndarray::s;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;

/// Shifts rows by `n` (down when positive, up when negative), filling vacated rows with NaN.
pub fn shift(xs: ArrayView2<'_, f64>, n: isize) -> Array2<f64> {
  let rows = xs.nrows();
  let mut out = Array2::<f64>::from_elem(xs.raw_dim(), f64::NAN);
  let k = n.unsigned_abs().min(rows);

  if n >= 0 {
    out.slice_mut(s![k.., ..]).assign(&xs.slice(s![..rows - k, ..]));
  } else {
    out.slice_mut(s![..rows - k, ..]).assign(&xs.slice(s![k.., ..]));
  }

  out
}

/// Row-wise log returns, `(rows - 1) x cols`.
pub fn log_returns(prices: ArrayView2<'_, f64>) -> Array2<f64> {
  if prices.nrows() < 2 {
    return Array2::zeros((0, prices.ncols()));
  }
  let ln = prices.mapv(f64::ln);
  &ln.slice(s![1.., ..]) - &ln.slice(s![..-1, ..])
}

/// First differences along time, `(rows - 1) x cols`.
pub fn diff(xs: ArrayView2<'_, f64>) -> Array2<f64> {
  if xs.nrows() < 2 {
    return Array2::zeros((0, xs.ncols()));
  }
  &xs.slice(s![1.., ..]) - &xs.slice(s![..-1, ..])
}

/// Last row of a `time x assets` frame.
pub fn last(xs: ArrayView2<'_, f64>) -> Vec<f64> {
  match xs.nrows() {
    0 => Vec::new(),
    n => xs.index_axis(Axis(0), n - 1).to_vec(),
  }
}
