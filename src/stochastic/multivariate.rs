//! # Multivariate
//!
//! $$
//! S^{(i)}_t = f_i\big(S^{(i)}_{t-1}, \varepsilon^{(i)}_t\big),\qquad
//! \operatorname{corr}\big(\varepsilon^{(i)}_t, \varepsilon^{(j)}_t\big) = R_{ij}
//! $$
//!
//! Each asset runs through its single-asset simulator on its own slice of a correlated noise
//! cube. Generated noise has unit volatilities; the asset's `sigma` scales it in the recursion.
//!
pub mod gbm_mv;
pub mod ou_mv;

use std::borrow::Cow;

use ndarray::Array2;
use ndarray::Array3;
use ndarray::Axis;
use tracing::debug;

use crate::error::Result;
use crate::error::SimError;
use crate::stochastic::noise::cgns::CGNS;
use crate::stochastic::noise::rng;
use crate::stochastic::noise::Grid;

/// Correlation and noise options shared by the multi-asset wrappers.
pub(crate) struct MvNoise<'a> {
  pub cor: Option<&'a Array2<f64>>,
  pub eps: Option<&'a Array3<f64>>,
  pub t: f64,
  pub dt: Option<f64>,
  pub sims: usize,
  pub seed: Option<u64>,
}

impl<'a> MvNoise<'a> {
  /// Asset count: the noise cube wins, then the correlation matrix, then `fallback`.
  pub fn assets(&self, fallback: usize) -> usize {
    match (self.eps, self.cor) {
      (Some(eps), _) => eps.dim().2,
      (None, Some(cor)) => cor.nrows(),
      (None, None) => fallback,
    }
  }

  /// Supplied noise as is, or standard-scale correlated draws shaped `(N, sims, assets)`.
  ///
  /// The returned horizon and step reproduce the resolved grid when handed to a single-asset
  /// simulator together with one asset slice of the noise.
  pub fn resolve(&self, assets: usize) -> Result<Resolved<'a>> {
    if let Some(eps) = self.eps {
      let (n, sims, k) = eps.dim();
      if k == 0 {
        return Err(SimError::shape("eps", "(steps, sims, assets > 0)", format!("{:?}", eps.dim())));
      }
      let grid = Grid::resolve(self.t, self.dt, self.sims, Some((n, sims)))?;
      return Ok(Resolved {
        eps: Cow::Borrowed(eps),
        t: self.t,
        dt: grid.dt,
      });
    }

    let grid = Grid::resolve(self.t, self.dt, self.sims, None)?;
    let identity;
    let cor = match self.cor {
      Some(cor) => cor,
      None => {
        identity = Array2::<f64>::eye(assets);
        &identity
      }
    };

    let cgns = CGNS::new(vec![1.0; assets].as_slice(), cor, None)?;
    let mut rng = rng(self.seed);
    debug!(steps = grid.n, sims = grid.sims, assets, "drawing correlated noise");

    Ok(Resolved {
      eps: Cow::Owned(cgns.sample_using(grid.n, grid.sims, &mut rng)),
      t: grid.n as f64 * grid.dt,
      dt: grid.dt,
    })
  }
}

pub(crate) struct Resolved<'a> {
  pub eps: Cow<'a, Array3<f64>>,
  pub t: f64,
  pub dt: f64,
}

/// Fails unless at least one entry exists per asset.
pub(crate) fn check_len(name: &str, len: usize, assets: usize) -> Result<()> {
  if len < assets {
    return Err(SimError::shape(name, format!("{assets} per-asset entries"), len));
  }
  Ok(())
}

/// Stacks per-asset `(N + 1, sims)` paths along a trailing asset axis.
pub(crate) fn stack_assets(paths: &[Array2<f64>]) -> Result<Array3<f64>> {
  let views = paths.iter().map(|p| p.view()).collect::<Vec<_>>();
  ndarray::stack(Axis(2), &views).map_err(|e| SimError::Numerical(e.to_string()))
}
