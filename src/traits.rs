//! # Traits
//!
//! $$
//! \text{Trait contracts: }\mathcal{A}:\text{inputs}\to\text{samples}
//! $$
//!
use ndarray::Array2;
use ndarray::Array3;

use crate::error::Result;

/// A configured process that can draw a full set of paths in one call.
///
/// Implementors hold every input explicitly, so two calls with the same seed (or the same
/// supplied noise) return identical arrays.
pub trait ProcessExt: Send + Sync {
  type Output: Send;

  fn sample(&self) -> Result<Self::Output>;
}

/// Single-asset output: `(steps + 1) x sims`.
pub type Paths = Array2<f64>;

/// Multi-asset output: `(steps + 1) x sims x assets`.
pub type PathsMv = Array3<f64>;
