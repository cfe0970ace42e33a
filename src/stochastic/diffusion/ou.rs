//! # OU
//!
//! $$
//! S_t = S_{t-1} + \theta_t(\mu_t - S_{t-1})\Delta t + \sigma_t\sqrt{\Delta t}\,\varepsilon_t
//! $$
//!
use impl_new_derive::ImplNew;
use ndarray::Array2;
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

/// Ornstein-Uhlenbeck price simulator.
///
/// With `log_price` the recursion runs on `ln S` from `ln s0` and the result is exponentiated, so
/// `mu`, `theta` and `sigma` then describe the log price.
#[derive(ImplNew, Clone, Debug)]
pub struct OU {
  pub s0: f64,
  pub mu: Param,
  pub theta: Param,
  pub sigma: Param,
  pub t: f64,
  pub dt: Option<f64>,
  pub sims: usize,
  pub eps: Option<Array2<f64>>,
  pub seed: Option<u64>,
  pub log_price: bool,
  pub backend: Backend,
}

impl OU {
  fn grid(&self) -> Result<Grid> {
    Grid::resolve(self.t, self.dt, self.sims, self.eps.as_ref().map(|e| e.dim()))
  }

  fn validate(&self, grid: &Grid) -> Result<()> {
    if !self.s0.is_finite() {
      return Err(SimError::invalid("s0", "must be finite"));
    }
    if self.log_price && self.s0 <= 0.0 {
      return Err(SimError::invalid("s0", "must be positive for log prices"));
    }
    self.mu.validate("mu", grid.n, grid.sims)?;
    self.theta.validate("theta", grid.n, grid.sims)?;
    self.sigma.validate("sigma", grid.n, grid.sims)?;
    Ok(())
  }

  fn x0(&self) -> f64 {
    if self.log_price {
      self.s0.ln()
    } else {
      self.s0
    }
  }

  fn run_loop(&self, grid: &Grid, eps: &Array2<f64>) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((grid.n + 1, grid.sims));
    let dt = grid.dt;
    let sqrt_dt = dt.sqrt();

    for s in 0..grid.sims {
      x[[0, s]] = self.x0();
    }

    for t in 1..=grid.n {
      for s in 0..grid.sims {
        let prev = x[[t - 1, s]];
        x[[t, s]] = prev
          + self.theta.at(t - 1, s) * (self.mu.at(t - 1, s) - prev) * dt
          + self.sigma.at(t - 1, s) * sqrt_dt * eps[[t - 1, s]];
      }
    }

    x
  }

  fn run_vectorized(&self, grid: &Grid, eps: &Array2<f64>) -> Array2<f64> {
    let mut x = Array2::<f64>::from_elem((grid.n + 1, grid.sims), self.x0());
    let dt = grid.dt;
    let sqrt_dt = dt.sqrt();

    for t in 1..=grid.n {
      let theta = self.theta.row(t - 1, grid.sims);
      let mu = self.mu.row(t - 1, grid.sims);
      let sigma = self.sigma.row(t - 1, grid.sims);

      let prev = x.row(t - 1);
      let next = &prev + &(&theta * &(&mu - &prev) * dt) + &(&sigma * sqrt_dt * &eps.row(t - 1));
      x.row_mut(t).assign(&next);
    }

    x
  }
}

impl ProcessExt for OU {
  type Output = Paths;

  #[instrument(name = "ou", skip(self), fields(backend = ?self.backend))]
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

    debug!(steps = grid.n, sims = grid.sims, dt = grid.dt, "simulating OU paths");

    let mut x = match self.backend {
      Backend::Loop => self.run_loop(&grid, eps),
      Backend::Vectorized => self.run_vectorized(&grid, eps),
    };

    if self.log_price {
      x.mapv_inplace(f64::exp);
    }

    Ok(x)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use ndarray::s;
  use ndarray::Array1;
  use ndarray_rand::RandomExt;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::StandardNormal;

  use super::*;

  const EPS: [f64; 16] = [
    0.1, -0.2, 0.5, 0.3, -0.4, -0.3, 0.2, 0.1, -0.2, 0.5, 0.3, -0.4, -0.3, 0.2, 0.1, 0.5,
  ];

  fn fixed_eps() -> Array2<f64> {
    let col = Array1::from(EPS.to_vec());
    ndarray::stack![ndarray::Axis(1), col, col]
  }

  fn ou(mu: Param, theta: Param, sigma: Param, seed: u64, backend: Backend) -> OU {
    OU::new(5.0, mu, theta, sigma, 4.0, Some(0.25), 2, None, Some(seed), false, backend)
  }

  #[test]
  fn ou_starts_with_s0() {
    for backend in Backend::ALL {
      let x = ou(4.0.into(), 2.0.into(), 0.32.into(), 1, backend).sample().unwrap();
      assert_eq!(x.dim(), (17, 2));
      assert!(x.row(0).iter().all(|&v| v == 5.0));
    }
  }

  #[test]
  fn ou_matches_reference_path_with_drift_adjusted_mean() {
    // mean lowered by sigma^2 / (2 theta)
    let mu = 4.0 - 0.5 * 0.32_f64.powi(2) / 2.0;
    let expected = [
      5.0, 4.50320, 4.20680, 4.17060, 4.12050, 3.98345, 3.93093, 3.98466, 3.99553, 3.95297,
      4.04368, 4.05704, 3.95172, 3.91506, 3.97673, 3.99157, 4.06298,
    ];

    for backend in Backend::ALL {
      let x = OU::new(
        5.0,
        mu.into(),
        2.0.into(),
        0.32.into(),
        4.0,
        Some(0.25),
        2,
        Some(fixed_eps()),
        None,
        false,
        backend,
      )
      .sample()
      .unwrap();

      for (t, e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(x[[t, 0]], *e, epsilon = 1e-4);
        assert_abs_diff_eq!(x[[t, 1]], *e, epsilon = 1e-4);
      }
    }
  }

  #[test]
  fn backends_agree_on_fixed_noise() {
    let mk = |backend| {
      OU::new(
        5.0,
        4.0.into(),
        2.0.into(),
        0.32.into(),
        4.0,
        None,
        0,
        Some(fixed_eps()),
        None,
        true,
        backend,
      )
    };
    let a = mk(Backend::Loop).sample().unwrap();
    let b = mk(Backend::Vectorized).sample().unwrap();
    assert_abs_diff_eq!(a, b, epsilon = 1e-10);
  }

  #[test]
  fn log_price_runs_in_log_space() {
    let eps = Array2::<f64>::zeros((1, 1));
    let x = OU::new(
      5.0,
      1.0.into(),
      2.0.into(),
      0.32.into(),
      0.25,
      None,
      1,
      Some(eps),
      None,
      true,
      Backend::Loop,
    )
    .sample()
    .unwrap();

    let expected = (5.0_f64.ln() + 2.0 * (1.0 - 5.0_f64.ln()) * 0.25).exp();
    assert_abs_diff_eq!(x[[1, 0]], expected, epsilon = 1e-12);
    assert_abs_diff_eq!(x[[0, 0]], 5.0, epsilon = 1e-12);
  }

  #[test]
  fn seed_matches_explicit_noise() {
    let mut rng = StdRng::seed_from_u64(12345);
    let eps = Array2::<f64>::random_using((16, 2), StandardNormal, &mut rng);

    for backend in Backend::ALL {
      let explicit = OU::new(
        5.0,
        4.0.into(),
        2.0.into(),
        0.32.into(),
        4.0,
        Some(0.25),
        2,
        Some(eps.clone()),
        None,
        false,
        backend,
      )
      .sample()
      .unwrap();
      let seeded = ou(4.0.into(), 2.0.into(), 0.32.into(), 12345, backend)
        .sample()
        .unwrap();
      assert_abs_diff_eq!(explicit, seeded, epsilon = 1e-12);
    }
  }

  #[test]
  fn repeated_parameters_match_scalar() {
    for backend in Backend::ALL {
      let base = ou(4.0.into(), 2.0.into(), 0.32.into(), 12345, backend).sample().unwrap();

      let mus = ou(Array1::from_elem(16, 4.0).into(), 2.0.into(), 0.32.into(), 12345, backend);
      assert_abs_diff_eq!(base, mus.sample().unwrap(), epsilon = 1e-12);

      let sigmas = ou(4.0.into(), 2.0.into(), Array1::from_elem(16, 0.32).into(), 12345, backend);
      assert_abs_diff_eq!(base, sigmas.sample().unwrap(), epsilon = 1e-12);

      let sigmas_2d = ou(4.0.into(), 2.0.into(), Array2::from_elem((16, 2), 0.32).into(), 12345, backend);
      assert_abs_diff_eq!(base, sigmas_2d.sample().unwrap(), epsilon = 1e-12);

      let thetas_2d = ou(4.0.into(), Array2::from_elem((16, 2), 2.0).into(), 0.32.into(), 12345, backend);
      assert_abs_diff_eq!(base, thetas_2d.sample().unwrap(), epsilon = 1e-12);
    }
  }

  #[test]
  fn time_varying_mu_shifts_the_level() {
    let mut mu = Array2::<f64>::from_elem((252, 1000), 4.0);
    mu.slice_mut(s![100.., ..100]).fill(8.0);

    for backend in Backend::ALL {
      let x = OU::new(
        5.0,
        mu.clone().into(),
        8.0.into(),
        0.32.into(),
        1.0,
        Some(1.0 / 252.0),
        1000,
        None,
        Some(12345),
        false,
        backend,
      )
      .sample()
      .unwrap();

      let shifted = x.slice(s![152, ..100]).mean().unwrap() / x.slice(s![25, ..100]).mean().unwrap();
      let unshifted = x.slice(s![152, 100..]).mean().unwrap() / x.slice(s![25, 100..]).mean().unwrap();
      assert!(shifted > 1.5, "shifted ratio = {shifted}");
      assert!(unshifted < 1.5, "unshifted ratio = {unshifted}");
    }
  }

  #[test]
  fn time_varying_theta_speeds_reversion() {
    // slow reversion for 100 steps, then fast; a path far below the mean catches up
    let mut theta = Array1::<f64>::from_elem(252, 0.5);
    theta.slice_mut(s![100..]).fill(20.0);

    for backend in Backend::ALL {
      let x = OU::new(
        1.0,
        10.0.into(),
        theta.clone().into(),
        0.1.into(),
        1.0,
        Some(1.0 / 252.0),
        200,
        None,
        Some(7),
        false,
        backend,
      )
      .sample()
      .unwrap();

      let early = x.row(100).mean().unwrap() / x.row(50).mean().unwrap();
      let late = x.row(150).mean().unwrap() / x.row(100).mean().unwrap();
      assert!(late > 2.0 * early, "early = {early}, late = {late}");
    }
  }

  #[test]
  fn time_varying_sigma_widens_dispersion() {
    let mut sigma = Array2::<f64>::from_elem((252, 1000), 0.1);
    sigma.slice_mut(s![100.., ..]).fill(0.5);

    for backend in Backend::ALL {
      let x = OU::new(
        5.0,
        4.0.into(),
        2.0.into(),
        sigma.clone().into(),
        1.0,
        Some(1.0 / 252.0),
        1000,
        None,
        Some(12345),
        false,
        backend,
      )
      .sample()
      .unwrap();

      let ratio = x.row(152).std(1.0) / x.row(25).std(1.0);
      assert!(ratio > 3.0, "ratio = {ratio}");
    }
  }

  #[test]
  fn parameter_length_mismatch_is_a_shape_error() {
    let x = ou(Array1::from_elem(15, 4.0).into(), 2.0.into(), 0.32.into(), 1, Backend::Loop);
    assert!(matches!(x.sample(), Err(SimError::Shape { .. })));
  }

  #[test]
  fn missing_dt_and_eps_is_a_configuration_error() {
    let x = OU::new(
      5.0,
      4.0.into(),
      2.0.into(),
      0.32.into(),
      1.0,
      None,
      10,
      None,
      Some(1),
      false,
      Backend::Loop,
    );
    assert!(matches!(x.sample(), Err(SimError::Configuration(_))));
  }

  #[test]
  fn dt_is_derived_from_eps() {
    let eps = array![[0.5], [-0.5]];
    let x = OU::new(
      1.0,
      0.0.into(),
      1.0.into(),
      1.0.into(),
      2.0,
      None,
      99,
      Some(eps),
      None,
      false,
      Backend::Loop,
    )
    .sample()
    .unwrap();

    // dt = 1: x1 = 1 - 1 + 0.5, x2 = 0.5 - 0.5 - 0.5
    assert_eq!(x.dim(), (3, 1));
    assert_abs_diff_eq!(x[[1, 0]], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(x[[2, 0]], -0.5, epsilon = 1e-12);
  }
}
