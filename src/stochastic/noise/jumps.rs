//! # Jump noise
//!
//! $$
//! J_{t,s} = N_{t,s}\,Y_{t,s},\qquad N \sim \operatorname{Poisson}(\lambda\,\Delta t),\quad
//! Y \sim \operatorname{LogNormal}(\ln \bar J, s_J)
//! $$
//!
use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::LogNormal;
use rand_distr::Poisson;

use crate::error::Result;
use crate::error::SimError;

/// Jump sizes (`elp`) and jump counts (`ejp`) on an `n x sims` grid.
#[derive(Clone, Debug, PartialEq)]
pub struct JumpNoise {
  pub elp: Array2<f64>,
  pub ejp: Array2<f64>,
}

/// Compound Poisson jump generator.
#[derive(Copy, Clone, Debug)]
pub struct Jumps {
  /// Typical jump size, the median of the lognormal size draw
  pub jump_avgsize: f64,
  /// Log-scale dispersion of the jump size
  pub jump_stdv: f64,
  /// Annual jump intensity
  pub jump_prob: f64,
}

impl Jumps {
  pub fn new(jump_avgsize: f64, jump_stdv: f64, jump_prob: f64) -> Result<Self> {
    if !(0.0..=1.0).contains(&jump_prob) {
      return Err(SimError::invalid(
        "jump_prob",
        format!("must lie in [0, 1], got {jump_prob}"),
      ));
    }
    if !(jump_avgsize.is_finite() && jump_avgsize > 0.0) {
      return Err(SimError::invalid(
        "jump_avgsize",
        format!("must be positive, got {jump_avgsize}"),
      ));
    }
    if !(jump_stdv.is_finite() && jump_stdv >= 0.0) {
      return Err(SimError::invalid(
        "jump_stdv",
        format!("must be non-negative, got {jump_stdv}"),
      ));
    }

    Ok(Self {
      jump_avgsize,
      jump_stdv,
      jump_prob,
    })
  }

  /// Mean jump contribution per unit time, used to compensate the long-run mean.
  pub fn compensator(&self) -> f64 {
    self.jump_prob * self.jump_avgsize
  }

  /// Draws all sizes first, then all counts, each row-major.
  pub fn sample_using<R: Rng + ?Sized>(
    &self,
    n: usize,
    sims: usize,
    dt: f64,
    rng: &mut R,
  ) -> Result<JumpNoise> {
    let size = LogNormal::new(self.jump_avgsize.ln(), self.jump_stdv)
      .map_err(|e| SimError::invalid("jump_stdv", e))?;
    let elp = Array2::random_using((n, sims), size, rng);

    let lambda = self.jump_prob * dt;
    let ejp = if lambda > 0.0 {
      let count = Poisson::new(lambda).map_err(|e| SimError::invalid("jump_prob", e))?;
      Array2::random_using((n, sims), count, rng)
    } else {
      Array2::zeros((n, sims))
    };

    Ok(JumpNoise { elp, ejp })
  }
}

#[cfg(test)]
mod tests {
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;

  #[test]
  fn jump_prob_outside_unit_interval_is_rejected() {
    assert!(matches!(
      Jumps::new(1.0, 0.3, 1.5),
      Err(SimError::InvalidValue { .. })
    ));
    assert!(Jumps::new(1.0, 0.3, -0.1).is_err());
  }

  #[test]
  fn zero_intensity_never_jumps() {
    let mut rng = StdRng::seed_from_u64(3);
    let noise = Jumps::new(3.0, 0.05, 0.0)
      .unwrap()
      .sample_using(50, 20, 1.0 / 252.0, &mut rng)
      .unwrap();
    assert!(noise.ejp.iter().all(|&c| c == 0.0));
  }

  #[test]
  fn jump_sizes_center_on_avgsize() {
    let mut rng = StdRng::seed_from_u64(4);
    let noise = Jumps::new(10.0, 0.05, 0.5)
      .unwrap()
      .sample_using(100, 100, 1.0 / 252.0, &mut rng)
      .unwrap();
    let mean = noise.elp.mean().unwrap();
    assert!((mean - 10.0).abs() < 0.1, "mean jump size = {mean}");
  }

  #[test]
  fn jump_counts_match_intensity() {
    let mut rng = StdRng::seed_from_u64(5);
    let dt = 0.25;
    let noise = Jumps::new(1.0, 0.1, 0.8)
      .unwrap()
      .sample_using(400, 250, dt, &mut rng)
      .unwrap();
    let rate = noise.ejp.mean().unwrap();
    assert!((rate - 0.8 * dt).abs() < 0.01, "rate = {rate}");
  }
}
