use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;

/// Standard Gaussian noise on an `n x sims` grid.
#[derive(Copy, Clone, Debug)]
pub struct Gn {
  pub n: usize,
  pub sims: usize,
}

impl Gn {
  pub fn new(n: usize, sims: usize) -> Self {
    Gn { n, sims }
  }

  /// Draws the grid in row-major order, one step at a time across simulations.
  pub fn sample_using<R: Rng + ?Sized>(&self, rng: &mut R) -> Array2<f64> {
    Array2::random_using((self.n, self.sims), StandardNormal, rng)
  }
}
