use impl_new_derive::ImplNew;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::Axis;
use tracing::instrument;

use super::check_len;
use super::stack_assets;
use super::MvNoise;
use crate::error::Result;
use crate::stochastic::diffusion::gbm::GBM;
use crate::stochastic::param::Param;
use crate::stochastic::Backend;
use crate::traits::PathsMv;
use crate::traits::ProcessExt;

/// Correlated basket of lognormal prices.
#[derive(ImplNew, Clone, Debug)]
pub struct GbmMv {
  pub s0: Vec<f64>,
  pub r: Vec<Param>,
  pub sigma: Vec<Param>,
  pub cor: Option<Array2<f64>>,
  pub t: f64,
  pub dt: Option<f64>,
  pub sims: usize,
  pub eps: Option<Array3<f64>>,
  pub seed: Option<u64>,
  pub backend: Backend,
}

impl ProcessExt for GbmMv {
  type Output = PathsMv;

  #[instrument(name = "gbm_mv", skip(self), fields(backend = ?self.backend))]
  fn sample(&self) -> Result<Self::Output> {
    let noise = MvNoise {
      cor: self.cor.as_ref(),
      eps: self.eps.as_ref(),
      t: self.t,
      dt: self.dt,
      sims: self.sims,
      seed: self.seed,
    };
    let assets = noise.assets(self.s0.len());

    check_len("s0", self.s0.len(), assets)?;
    check_len("r", self.r.len(), assets)?;
    check_len("sigma", self.sigma.len(), assets)?;

    let resolved = noise.resolve(assets)?;

    let paths = (0..assets)
      .map(|i| {
        GBM::new(
          self.s0[i],
          self.r[i].clone(),
          self.sigma[i].clone(),
          resolved.t,
          Some(resolved.dt),
          self.sims,
          Some(resolved.eps.index_axis(Axis(2), i).to_owned()),
          None,
          self.backend,
        )
        .sample()
      })
      .collect::<Result<Vec<_>>>()?;

    stack_assets(&paths)
  }
}
