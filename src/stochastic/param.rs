//! # Param
//!
//! $$
//! p_{t,s} = \begin{cases} p & \text{scalar} \\ p_t & \text{time series} \\ p_{t,s} & \text{time by simulation} \end{cases}
//! $$
//!
use ndarray::Array1;
use ndarray::Array2;
use ndarray::CowArray;
use ndarray::Ix1;

use crate::error::Result;
use crate::error::SimError;

/// A model parameter that may vary over time and across simulations.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
  /// Constant for every step and simulation.
  Scalar(f64),
  /// One value per step, shared by all simulations.
  TimeSeries(Array1<f64>),
  /// One value per `(step, sim)` cell.
  TimeBySim(Array2<f64>),
}

impl Param {
  /// Value used at step `t` (0-based, the step producing row `t + 1`) for simulation `sim`.
  #[inline]
  pub fn at(&self, t: usize, sim: usize) -> f64 {
    match self {
      Param::Scalar(v) => *v,
      Param::TimeSeries(v) => v[t],
      Param::TimeBySim(v) => v[[t, sim]],
    }
  }

  /// Values for every simulation at step `t`. Borrows the row when the data already has one.
  pub fn row(&self, t: usize, sims: usize) -> CowArray<'_, f64, Ix1> {
    match self {
      Param::Scalar(v) => CowArray::from(Array1::from_elem(sims, *v)),
      Param::TimeSeries(v) => CowArray::from(Array1::from_elem(sims, v[t])),
      Param::TimeBySim(v) => CowArray::from(v.row(t)),
    }
  }

  /// Checks that the time axis has exactly `n` steps and the simulation axis `sims` columns.
  pub fn validate(&self, name: &str, n: usize, sims: usize) -> Result<()> {
    match self {
      Param::Scalar(v) => {
        if !v.is_finite() {
          return Err(SimError::invalid(name, "must be finite"));
        }
      }
      Param::TimeSeries(v) => {
        if v.len() != n {
          return Err(SimError::shape(name, format!("({n},)"), format!("({},)", v.len())));
        }
      }
      Param::TimeBySim(v) => {
        if v.dim() != (n, sims) {
          return Err(SimError::shape(
            name,
            format!("({n}, {sims})"),
            format!("{:?}", v.dim()),
          ));
        }
      }
    }

    if self.values().any(|x| !x.is_finite()) {
      return Err(SimError::invalid(name, "contains non-finite values"));
    }

    Ok(())
  }

  fn values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
    match self {
      Param::Scalar(v) => Box::new(std::iter::once(*v)),
      Param::TimeSeries(v) => Box::new(v.iter().copied()),
      Param::TimeBySim(v) => Box::new(v.iter().copied()),
    }
  }

  pub(crate) fn any(&self, pred: impl Fn(f64) -> bool) -> bool {
    self.values().any(pred)
  }
}

impl From<f64> for Param {
  fn from(v: f64) -> Self {
    Param::Scalar(v)
  }
}

impl From<Array1<f64>> for Param {
  fn from(v: Array1<f64>) -> Self {
    Param::TimeSeries(v)
  }
}

impl From<Vec<f64>> for Param {
  fn from(v: Vec<f64>) -> Self {
    Param::TimeSeries(Array1::from(v))
  }
}

impl From<Array2<f64>> for Param {
  fn from(v: Array2<f64>) -> Self {
    Param::TimeBySim(v)
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  #[test]
  fn scalar_broadcasts_everywhere() {
    let p = Param::from(0.3);
    assert_eq!(p.at(0, 0), 0.3);
    assert_eq!(p.at(7, 4), 0.3);
    assert_eq!(p.row(2, 3).to_vec(), vec![0.3; 3]);
  }

  #[test]
  fn time_series_indexes_by_step() {
    let p = Param::from(vec![1.0, 2.0, 3.0]);
    assert_eq!(p.at(1, 5), 2.0);
    assert_eq!(p.row(2, 2).to_vec(), vec![3.0, 3.0]);
  }

  #[test]
  fn time_by_sim_indexes_both_axes() {
    let p = Param::from(array![[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(p.at(1, 0), 3.0);
    assert_eq!(p.row(0, 2).to_vec(), vec![1.0, 2.0]);
  }

  #[test]
  fn validate_rejects_wrong_length() {
    let p = Param::from(vec![1.0; 15]);
    assert!(matches!(
      p.validate("mu", 16, 2),
      Err(SimError::Shape { .. })
    ));
    assert!(p.validate("mu", 15, 2).is_ok());
  }

  #[test]
  fn validate_rejects_wrong_sim_axis() {
    let p = Param::from(Array2::<f64>::ones((16, 3)));
    assert!(p.validate("sigma", 16, 2).is_err());
    assert!(p.validate("sigma", 16, 3).is_ok());
  }

  #[test]
  fn validate_rejects_nan() {
    let p = Param::from(vec![1.0, f64::NAN]);
    assert!(matches!(
      p.validate("theta", 2, 1),
      Err(SimError::InvalidValue { .. })
    ));
  }
}
