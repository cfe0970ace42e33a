use impl_new_derive::ImplNew;
use ndarray::s;
use ndarray::Array2;
use ndarray::Axis;
use tracing::debug;
use tracing::instrument;

use crate::error::Result;
use crate::error::SimError;
use crate::stochastic::noise::gn::Gn;
use crate::stochastic::noise::rng;
use crate::stochastic::noise::Grid;
use crate::stochastic::param::Param;
use crate::stochastic::Backend;
use crate::traits::Paths;
use crate::traits::ProcessExt;

/// Geometric Brownian motion with drift `r`:
/// `S_t = S_{t-1} exp((r - sigma^2 / 2) dt + sigma sqrt(dt) eps_t)`.
#[derive(ImplNew, Clone, Debug)]
pub struct GBM {
  pub s0: f64,
  pub r: Param,
  pub sigma: Param,
  pub t: f64,
  pub dt: Option<f64>,
  pub sims: usize,
  pub eps: Option<Array2<f64>>,
  pub seed: Option<u64>,
  pub backend: Backend,
}

impl GBM {
  fn grid(&self) -> Result<Grid> {
    Grid::resolve(self.t, self.dt, self.sims, self.eps.as_ref().map(|e| e.dim()))
  }

  fn validate(&self, grid: &Grid) -> Result<()> {
    if !self.s0.is_finite() {
      return Err(SimError::invalid("s0", "must be finite"));
    }
    self.r.validate("r", grid.n, grid.sims)?;
    self.sigma.validate("sigma", grid.n, grid.sims)?;
    if self.sigma.any(|v| v < 0.0) {
      return Err(SimError::invalid("sigma", "must be non-negative"));
    }
    Ok(())
  }

  fn run_loop(&self, grid: &Grid, eps: &Array2<f64>) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((grid.n + 1, grid.sims));
    let dt = grid.dt;
    let sqrt_dt = dt.sqrt();

    for s in 0..grid.sims {
      let mut level = self.s0;
      x[[0, s]] = level;

      for t in 1..=grid.n {
        let sigma = self.sigma.at(t - 1, s);
        let growth = ((self.r.at(t - 1, s) - 0.5 * sigma * sigma) * dt
          + sigma * sqrt_dt * eps[[t - 1, s]])
          .exp();
        level *= growth;
        x[[t, s]] = level;
      }
    }

    x
  }

  /// Builds the whole growth-factor matrix, then takes a cumulative product over time.
  fn run_vectorized(&self, grid: &Grid, eps: &Array2<f64>) -> Array2<f64> {
    let mut x = Array2::<f64>::from_elem((grid.n + 1, grid.sims), self.s0);
    let dt = grid.dt;
    let sqrt_dt = dt.sqrt();

    for t in 1..=grid.n {
      let r = self.r.row(t - 1, grid.sims);
      let sigma = self.sigma.row(t - 1, grid.sims);
      let drift = (&r - &(&sigma * &sigma * 0.5)) * dt;
      let growth = (drift + &(&sigma * sqrt_dt * &eps.row(t - 1))).mapv(f64::exp);
      x.slice_mut(s![t, ..]).assign(&growth);
    }

    x.accumulate_axis_inplace(Axis(0), |&prev, curr| *curr *= prev);
    x
  }
}

impl ProcessExt for GBM {
  type Output = Paths;

  #[instrument(name = "gbm", skip(self), fields(backend = ?self.backend))]
  fn sample(&self) -> Result<Self::Output> {
    let grid = self.grid()?;
    self.validate(&grid)?;

    let drawn;
    let eps = match &self.eps {
      Some(eps) => eps,
      None => {
        let mut rng = rng(self.seed);
        drawn = Gn::new(grid.n, grid.sims).sample_using(&mut rng);
        &drawn
      }
    };

    debug!(steps = grid.n, sims = grid.sims, dt = grid.dt, "simulating GBM paths");

    Ok(match self.backend {
      Backend::Loop => self.run_loop(&grid, eps),
      Backend::Vectorized => self.run_vectorized(&grid, eps),
    })
  }
}
