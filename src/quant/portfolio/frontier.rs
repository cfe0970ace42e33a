//! # Efficient Frontier
//!
//! $$
//! P_{s,i} = \sum_t \max\big(S^{(i)}_{t,s}, 0\big),\qquad
//! \big(\sigma_p, \bar R_p\big) = \big(\operatorname{sd}(P\mathbf{w}), \operatorname{mean}(P\mathbf{w})\big)
//! $$
//!
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::Axis;
use ndarray::Zip;
use ndarray_rand::RandomExt;
use rand_distr::Uniform;
use tracing::debug;
use tracing::instrument;

use super::types::FrontierTable;
use super::types::PayoffFn;
use crate::error::Result;
use crate::error::SimError;
use crate::stochastic::noise::rng;

/// Reduces `time x sims x assets` paths to a `sims x assets` payoff matrix.
///
/// Without custom payoffs each asset pays `max(S, 0)` summed over time.
pub fn calculate_payoffs(paths: ArrayView3<'_, f64>, payoffs: Option<&[PayoffFn]>) -> Result<Array2<f64>> {
  let (_, sims, assets) = paths.dim();
  let mut out = Array2::<f64>::zeros((sims, assets));

  match payoffs {
    None => {
      for (asset, mut col) in paths.axis_iter(Axis(2)).zip(out.axis_iter_mut(Axis(1))) {
        col.assign(&asset.mapv(|s| s.max(0.0)).sum_axis(Axis(0)));
      }
    }
    Some(payoffs) => {
      if payoffs.len() != assets {
        return Err(SimError::shape("payoffs", assets, payoffs.len()));
      }
      for ((asset, f), mut col) in paths
        .axis_iter(Axis(2))
        .zip(payoffs)
        .zip(out.axis_iter_mut(Axis(1)))
      {
        let values = f(asset);
        if values.len() != sims {
          return Err(SimError::shape("payoff output", sims, values.len()));
        }
        col.assign(&values);
      }
    }
  }

  Ok(out)
}

/// Random long-only weights, `n_portfolios x n_assets`, each row summing to one.
pub fn generate_random_portfolio_weights(
  n_assets: usize,
  n_portfolios: usize,
  seed: Option<u64>,
) -> Result<Array2<f64>> {
  if n_assets == 0 {
    return Err(SimError::invalid("n_assets", "at least one asset is required"));
  }

  let mut rng = rng(seed);
  let mut w = Array2::random_using((n_portfolios, n_assets), Uniform::new(0.0, 1.0), &mut rng);
  for mut row in w.rows_mut() {
    let total = row.sum();
    row /= total;
  }

  Ok(w)
}

/// Risk and expected return of `payoffs . w` for every weight row, `n_portfolios x 2`.
#[instrument(skip_all, fields(portfolios = weights.nrows()))]
pub fn simulate_efficient_frontier(payoffs: ArrayView2<'_, f64>, weights: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
  let (sims, assets) = payoffs.dim();
  if weights.ncols() != assets {
    return Err(SimError::shape("weights", format!("(_, {assets})"), format!("{:?}", weights.dim())));
  }
  if sims < 2 {
    return Err(SimError::InsufficientData {
      required: 2,
      provided: sims,
    });
  }

  let mut out = Array2::<f64>::zeros((weights.nrows(), 2));
  Zip::from(out.rows_mut())
    .and(weights.rows())
    .par_for_each(|mut out, w| {
      let portfolio = payoffs.dot(&w);
      out[0] = portfolio.std(1.0);
      out[1] = portfolio.mean().unwrap_or(f64::NAN);
    });

  debug!(sims, assets, "evaluated frontier");
  Ok(out)
}

/// Joins frontier results with the weights that produced them.
pub fn make_efficient_frontier_table(
  returns: ArrayView2<'_, f64>,
  weights: ArrayView2<'_, f64>,
  names: &[&str],
) -> Result<FrontierTable> {
  if returns.ncols() != 2 {
    return Err(SimError::shape("returns", "(_, 2)", format!("{:?}", returns.dim())));
  }
  if returns.nrows() != weights.nrows() {
    return Err(SimError::shape("weights", returns.nrows(), weights.nrows()));
  }
  if names.len() != weights.ncols() {
    return Err(SimError::shape("names", weights.ncols(), names.len()));
  }

  Ok(FrontierTable {
    names: names.iter().map(|n| n.to_string()).collect(),
    risk: returns.column(0).to_owned(),
    expected_return: returns.column(1).to_owned(),
    weights: weights.to_owned(),
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use ndarray::Array1;
  use ndarray::Array3;

  use super::*;

  #[test]
  fn default_payoff_sums_positive_parts() {
    let mut paths = Array3::<f64>::zeros((3, 2, 2));
    paths.slice_mut(ndarray::s![.., 0, 0]).assign(&array![1.0, -2.0, 3.0]);
    paths.slice_mut(ndarray::s![.., 1, 1]).assign(&array![0.5, 0.5, 0.5]);

    let p = calculate_payoffs(paths.view(), None).unwrap();
    assert_eq!(p, array![[4.0, 0.0], [0.0, 1.5]]);
  }

  #[test]
  fn custom_payoffs_run_per_asset() {
    let paths = Array3::<f64>::from_elem((4, 3, 2), 2.0);
    let payoffs: Vec<PayoffFn> = vec![
      Box::new(|x: ArrayView2<'_, f64>| x.row(x.nrows() - 1).to_owned()),
      Box::new(|x: ArrayView2<'_, f64>| x.sum_axis(Axis(0)) * 10.0),
    ];
    let p = calculate_payoffs(paths.view(), Some(payoffs.as_slice())).unwrap();
    assert_eq!(p.column(0).to_vec(), vec![2.0; 3]);
    assert_eq!(p.column(1).to_vec(), vec![80.0; 3]);
  }

  #[test]
  fn payoff_count_must_match_assets() {
    let paths = Array3::<f64>::ones((2, 2, 3));
    let payoffs: Vec<PayoffFn> = vec![Box::new(|x: ArrayView2<'_, f64>| x.row(0).to_owned())];
    assert!(matches!(
      calculate_payoffs(paths.view(), Some(payoffs.as_slice())),
      Err(SimError::Shape { .. })
    ));
  }

  #[test]
  fn weights_are_normalised_and_seeded() {
    let a = generate_random_portfolio_weights(4, 50, Some(3)).unwrap();
    let b = generate_random_portfolio_weights(4, 50, Some(3)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.dim(), (50, 4));
    for row in a.rows() {
      assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
      assert!(row.iter().all(|&w| w >= 0.0));
    }
  }

  #[test]
  fn frontier_of_single_asset_portfolios() {
    let payoffs = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
    let weights = array![[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]];
    let f = simulate_efficient_frontier(payoffs.view(), weights.view()).unwrap();

    assert_abs_diff_eq!(f.row(0).to_owned(), array![2.0, 3.0], epsilon = 1e-12);
    assert_abs_diff_eq!(f.row(1).to_owned(), array![0.0, 10.0], epsilon = 1e-12);
    assert_abs_diff_eq!(f.row(2).to_owned(), array![1.0, 6.5], epsilon = 1e-12);
  }

  #[test]
  fn table_keeps_row_order() {
    let returns = array![[0.2, 1.0], [0.1, 0.8]];
    let weights = array![[0.3, 0.7], [0.6, 0.4]];
    let t = make_efficient_frontier_table(returns.view(), weights.view(), &["x", "y"]).unwrap();
    assert_eq!(t.risk, Array1::from(vec![0.2, 0.1]));
    assert_eq!(t.weights.row(1).to_vec(), vec![0.6, 0.4]);
    assert!(matches!(
      make_efficient_frontier_table(returns.view(), weights.view(), &["x"]),
      Err(SimError::Shape { .. })
    ));
  }
}
