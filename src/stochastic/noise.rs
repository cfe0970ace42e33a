//! # Noise
//!
//! $$
//! N = \operatorname{round}(T / \Delta t), \qquad \varepsilon \in \mathbb{R}^{N \times \text{sims}}
//! $$
//!
//! Supplied noise always wins: its shape fixes the step and simulation counts and `dt = T / N`.
//! Otherwise the grid comes from `T` and `dt`, and draws come from a generator built from the
//! seed for that call only.

pub mod cgns;
pub mod gn;
pub mod jumps;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::error::SimError;

/// Relative tolerance when checking a supplied `dt` against `T / eps.rows`.
const DT_TOLERANCE: f64 = 1e-9;

/// Resolved time grid of a simulation call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
  /// Number of steps
  pub n: usize,
  /// Step size in years
  pub dt: f64,
  /// Number of simulations
  pub sims: usize,
}

impl Grid {
  /// Resolves the grid from the horizon, an optional step and optional noise shape `(rows, cols)`.
  pub fn resolve(t: f64, dt: Option<f64>, sims: usize, noise: Option<(usize, usize)>) -> Result<Self> {
    if !(t.is_finite() && t > 0.0) {
      return Err(SimError::invalid("t", format!("horizon must be positive, got {t}")));
    }

    match noise {
      Some((rows, cols)) => {
        if rows == 0 || cols == 0 {
          return Err(SimError::shape("eps", "(steps > 0, sims > 0)", format!("({rows}, {cols})")));
        }

        let implied = t / rows as f64;
        if let Some(dt) = dt {
          if ((dt - implied) / implied).abs() > DT_TOLERANCE {
            return Err(SimError::Configuration(format!(
              "dt = {dt} disagrees with T / eps rows = {implied}"
            )));
          }
        }

        Ok(Self {
          n: rows,
          dt: implied,
          sims: cols,
        })
      }
      None => {
        let dt = dt.ok_or_else(|| {
          SimError::Configuration("either dt or a noise array must be provided".into())
        })?;

        if !(dt.is_finite() && dt > 0.0) {
          return Err(SimError::invalid("dt", format!("step must be positive, got {dt}")));
        }

        if sims == 0 {
          return Err(SimError::invalid("sims", "must be at least 1"));
        }

        let n = (t / dt).round() as usize;
        if n == 0 {
          return Err(SimError::invalid("dt", format!("T = {t} / dt = {dt} gives no steps")));
        }

        Ok(Self { n, dt, sims })
      }
    }
  }
}

/// Generator for one call: seeded when `seed` is given, from OS entropy otherwise.
pub fn rng(seed: Option<u64>) -> StdRng {
  match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grid_from_dt() {
    let grid = Grid::resolve(4.0, Some(0.25), 2, None).unwrap();
    assert_eq!(grid, Grid { n: 16, dt: 0.25, sims: 2 });
  }

  #[test]
  fn grid_rounds_daily_steps() {
    let grid = Grid::resolve(1.0, Some(1.0 / 252.0), 10, None).unwrap();
    assert_eq!(grid.n, 252);
  }

  #[test]
  fn grid_from_noise_overrides_sims() {
    let grid = Grid::resolve(4.0, None, 1000, Some((16, 2))).unwrap();
    assert_eq!(grid, Grid { n: 16, dt: 0.25, sims: 2 });
  }

  #[test]
  fn consistent_dt_and_noise_are_accepted() {
    assert!(Grid::resolve(4.0, Some(0.25), 2, Some((16, 2))).is_ok());
  }

  #[test]
  fn conflicting_dt_and_noise_are_rejected() {
    assert!(matches!(
      Grid::resolve(4.0, Some(0.5), 2, Some((16, 2))),
      Err(SimError::Configuration(_))
    ));
  }

  #[test]
  fn missing_dt_and_noise_is_a_configuration_error() {
    assert!(matches!(
      Grid::resolve(1.0, None, 10, None),
      Err(SimError::Configuration(_))
    ));
  }

  #[test]
  fn negative_dt_is_invalid() {
    assert!(matches!(
      Grid::resolve(1.0, Some(-0.1), 10, None),
      Err(SimError::InvalidValue { .. })
    ));
  }

  #[test]
  fn same_seed_same_stream() {
    use rand::Rng;

    let a: Vec<f64> = (0..5).map(|_| rng(Some(7)).gen()).collect();
    let mut r = rng(Some(7));
    let first: f64 = r.gen();
    assert!(a.iter().all(|x| *x == first));
  }
}
