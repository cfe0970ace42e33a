//! # OUJ
//!
//! $$
//! S_t = S_{t-1} + a_t\,\theta_t(\mu_t - \lambda\bar J - S_{t-1})S_{t-1}\Delta t
//!   + \sigma_t S_{t-1}\sqrt{\Delta t}\,\varepsilon_t + N_t Y_t
//! $$
//!
//! $a_t \in \{0, 1\}$ switches mean reversion off for `mr_lag` steps after every jump.
//!
use std::borrow::Cow;

use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;
use tracing::instrument;
use tracing::trace;

use crate::error::Result;
use crate::error::SimError;
use crate::stochastic::noise::gn::Gn;
use crate::stochastic::noise::jumps::JumpNoise;
use crate::stochastic::noise::jumps::Jumps;
use crate::stochastic::noise::rng;
use crate::stochastic::noise::Grid;
use crate::stochastic::param::Param;
use crate::stochastic::Backend;
use crate::traits::Paths;
use crate::traits::ProcessExt;

/// Mean-reverting price with compound lognormal jumps and a post-jump reversion lag.
#[derive(ImplNew, Clone, Debug)]
pub struct OUJ {
  pub s0: f64,
  pub mu: Param,
  pub theta: Param,
  pub sigma: Param,
  /// Median jump size
  pub jump_avgsize: f64,
  /// Annual jump intensity, in `[0, 1]`
  pub jump_prob: f64,
  /// Log-scale dispersion of jump sizes
  pub jump_stdv: f64,
  /// Steps after a jump during which mean reversion is switched off
  pub mr_lag: Option<usize>,
  pub t: f64,
  pub dt: Option<f64>,
  pub sims: usize,
  pub eps: Option<Array2<f64>>,
  pub elp: Option<Array2<f64>>,
  pub ejp: Option<Array2<f64>>,
  pub seed: Option<u64>,
  pub backend: Backend,
}

/// Steps of suppressed reversion left, one counter per simulation.
#[derive(Clone, Debug)]
pub struct LagState {
  remaining: Vec<usize>,
  lag: usize,
}

impl LagState {
  pub fn new(sims: usize, mr_lag: Option<usize>) -> Self {
    Self {
      remaining: vec![0; sims],
      lag: mr_lag.unwrap_or(0),
    }
  }

  /// Advances simulation `sim` by one step and reports whether reversion applies on it.
  #[inline]
  pub fn advance(&mut self, sim: usize, jumped: bool) -> bool {
    advance_lag(&mut self.remaining[sim], jumped, self.lag)
  }
}

/// One step of the lag rule: a jump at step `t` suppresses reversion on `t + 1 ..= t + lag`.
#[inline]
fn advance_lag(remaining: &mut usize, jumped: bool, lag: usize) -> bool {
  let suppressed = *remaining > 0;
  if suppressed {
    *remaining -= 1;
  }
  if jumped {
    *remaining = lag;
  }
  !suppressed
}

impl OUJ {
  fn jumps(&self) -> Result<Jumps> {
    Jumps::new(self.jump_avgsize, self.jump_stdv, self.jump_prob)
  }

  /// Supplied noise must come as a complete `eps`/`elp`/`ejp` set of one shape.
  fn supplied(&self) -> Result<Option<(&Array2<f64>, &Array2<f64>, &Array2<f64>)>> {
    match (&self.eps, &self.elp, &self.ejp) {
      (None, None, None) => Ok(None),
      (Some(eps), Some(elp), Some(ejp)) => {
        if elp.dim() != eps.dim() {
          return Err(SimError::shape("elp", format!("{:?}", eps.dim()), format!("{:?}", elp.dim())));
        }
        if ejp.dim() != eps.dim() {
          return Err(SimError::shape("ejp", format!("{:?}", eps.dim()), format!("{:?}", ejp.dim())));
        }
        Ok(Some((eps, elp, ejp)))
      }
      (eps, elp, ejp) => {
        let given = [("eps", eps), ("elp", elp), ("ejp", ejp)]
          .iter()
          .filter(|(_, a)| a.is_some())
          .map(|(name, _)| *name)
          .collect::<Vec<_>>()
          .join(", ");
        Err(SimError::shape(
          "eps/elp/ejp",
          "all three noise arrays or none",
          format!("only {given}"),
        ))
      }
    }
  }

  fn validate(&self, grid: &Grid) -> Result<()> {
    if !(self.s0.is_finite() && self.s0 > 0.0) {
      return Err(SimError::invalid("s0", "must be positive"));
    }
    self.mu.validate("mu", grid.n, grid.sims)?;
    self.theta.validate("theta", grid.n, grid.sims)?;
    self.sigma.validate("sigma", grid.n, grid.sims)?;
    Ok(())
  }

  fn run_loop(&self, grid: &Grid, compensator: f64, noise: Noise<'_>) -> Array2<f64> {
    let mut x = Array2::<f64>::from_elem((grid.n + 1, grid.sims), self.s0);
    let mut lag = LagState::new(grid.sims, self.mr_lag);
    let dt = grid.dt;
    let sqrt_dt = dt.sqrt();

    for t in 1..=grid.n {
      for s in 0..grid.sims {
        let prev = x[[t - 1, s]];
        let count = noise.ejp[[t - 1, s]];
        let active = if lag.advance(s, count > 0.0) { 1.0 } else { 0.0 };

        x[[t, s]] = prev
          + active
            * self.theta.at(t - 1, s)
            * (self.mu.at(t - 1, s) - compensator - prev)
            * prev
            * dt
          + self.sigma.at(t - 1, s) * prev * sqrt_dt * noise.eps[[t - 1, s]]
          + count * noise.elp[[t - 1, s]];
      }
    }

    x
  }

  fn run_vectorized(&self, grid: &Grid, compensator: f64, noise: Noise<'_>) -> Array2<f64> {
    let mut x = Array2::<f64>::from_elem((grid.n + 1, grid.sims), self.s0);
    let mut lag = LagState::new(grid.sims, self.mr_lag);
    let mut active = Array1::<f64>::zeros(grid.sims);
    let dt = grid.dt;
    let sqrt_dt = dt.sqrt();

    for t in 1..=grid.n {
      let ejp = noise.ejp.row(t - 1);
      for (s, a) in active.iter_mut().enumerate() {
        *a = if lag.advance(s, ejp[s] > 0.0) { 1.0 } else { 0.0 };
      }

      let theta = self.theta.row(t - 1, grid.sims);
      let mu = self.mu.row(t - 1, grid.sims);
      let sigma = self.sigma.row(t - 1, grid.sims);

      let prev = x.row(t - 1);
      let reversion = &active * &theta * &(&mu - compensator - &prev) * &prev * dt;
      let diffusion = &sigma * &prev * sqrt_dt * &noise.eps.row(t - 1);
      let next = &prev + &reversion + &diffusion + &(&ejp * &noise.elp.row(t - 1));
      x.row_mut(t).assign(&next);
    }

    x
  }
}

#[derive(Clone, Copy)]
struct Noise<'a> {
  eps: &'a Array2<f64>,
  elp: &'a Array2<f64>,
  ejp: &'a Array2<f64>,
}

impl ProcessExt for OUJ {
  type Output = Paths;

  #[instrument(name = "ouj", skip(self), fields(backend = ?self.backend, mr_lag = ?self.mr_lag))]
  fn sample(&self) -> Result<Self::Output> {
    let jumps = self.jumps()?;
    let supplied = self.supplied()?;
    let grid = Grid::resolve(self.t, self.dt, self.sims, supplied.map(|(eps, ..)| eps.dim()))?;
    self.validate(&grid)?;

    let (eps, elp, ejp): (Cow<'_, Array2<f64>>, Cow<'_, Array2<f64>>, Cow<'_, Array2<f64>>) =
      match supplied {
        Some((eps, elp, ejp)) => (Cow::Borrowed(eps), Cow::Borrowed(elp), Cow::Borrowed(ejp)),
        None => {
          let mut rng = rng(self.seed);
          let eps = Gn::new(grid.n, grid.sims).sample_using(&mut rng);
          let JumpNoise { elp, ejp } = jumps.sample_using(grid.n, grid.sims, grid.dt, &mut rng)?;
          (Cow::Owned(eps), Cow::Owned(elp), Cow::Owned(ejp))
        }
      };

    let noise = Noise {
      eps: &eps,
      elp: &elp,
      ejp: &ejp,
    };
    let compensator = jumps.compensator();

    debug!(steps = grid.n, sims = grid.sims, dt = grid.dt, "simulating OUJ paths");
    trace!(jumps = ejp.iter().filter(|&&c| c > 0.0).count(), compensator, "jump noise resolved");

    Ok(match self.backend {
      Backend::Loop => self.run_loop(&grid, compensator, noise),
      Backend::Vectorized => self.run_vectorized(&grid, compensator, noise),
    })
  }
}
