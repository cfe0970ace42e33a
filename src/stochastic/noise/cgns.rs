//! # Correlated Gaussian noise
//!
//! $$
//! \Sigma = \operatorname{diag}(\sigma)\,R\,\operatorname{diag}(\sigma), \qquad
//! \varepsilon_{t,s} = m + L z_{t,s},\quad L L^\top = \Sigma,\ z \sim N(0, I)
//! $$
//!
use nalgebra::DMatrix;
use nalgebra::SymmetricEigen;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::Axis;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use super::rng;
use super::Grid;
use crate::error::Result;
use crate::error::SimError;

const SYMMETRY_TOLERANCE: f64 = 1e-10;
const EIGEN_TOLERANCE: f64 = 1e-10;

/// Jointly correlated Gaussian noise across assets.
#[derive(Clone, Debug)]
pub struct CGNS {
  /// Per-asset standard deviations
  pub sigma: Array1<f64>,
  /// Correlation matrix
  pub cor: Array2<f64>,
  /// Per-asset means
  pub mu: Array1<f64>,
  factor: Array2<f64>,
}

impl CGNS {
  /// Validates the inputs and factorises the covariance.
  pub fn new(sigma: &[f64], cor: &Array2<f64>, mu: Option<&[f64]>) -> Result<Self> {
    let k = sigma.len();
    let (rows, cols) = cor.dim();

    if rows != cols {
      return Err(SimError::invalid(
        "cor",
        format!("correlation matrix must be square, got ({rows}, {cols})"),
      ));
    }
    if rows != k {
      return Err(SimError::shape("cor", format!("({k}, {k})"), format!("({rows}, {cols})")));
    }
    if k == 0 {
      return Err(SimError::invalid("sigma", "at least one asset is required"));
    }
    if sigma.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
      return Err(SimError::invalid("sigma", "volatilities must be finite and non-negative"));
    }

    for i in 0..k {
      if (cor[[i, i]] - 1.0).abs() > SYMMETRY_TOLERANCE {
        return Err(SimError::invalid("cor", format!("diagonal entry {i} is {}", cor[[i, i]])));
      }
      for j in 0..i {
        if (cor[[i, j]] - cor[[j, i]]).abs() > SYMMETRY_TOLERANCE {
          return Err(SimError::invalid("cor", "correlation matrix must be symmetric"));
        }
        if !(-1.0..=1.0).contains(&cor[[i, j]]) {
          return Err(SimError::invalid("cor", format!("entry ({i}, {j}) outside [-1, 1]")));
        }
      }
    }

    let mu = match mu {
      Some(mu) if mu.len() != k => {
        return Err(SimError::shape("mu", format!("({k},)"), format!("({},)", mu.len())));
      }
      Some(mu) => Array1::from(mu.to_vec()),
      None => Array1::zeros(k),
    };

    let sigma = Array1::from(sigma.to_vec());
    let cov = covariance(&sigma, cor);
    let factor = factorise(&cov)?;

    Ok(Self {
      sigma,
      cor: cor.clone(),
      mu,
      factor,
    })
  }

  /// Number of assets
  pub fn dim(&self) -> usize {
    self.sigma.len()
  }

  /// Draws one joint vector per `(step, sim)` in row-major order.
  pub fn sample_using<R: Rng + ?Sized>(&self, n: usize, sims: usize, rng: &mut R) -> Array3<f64> {
    let k = self.dim();
    let mut eps = Array3::<f64>::zeros((n, sims, k));
    let mut z = vec![0.0; k];

    for mut cell in eps.lanes_mut(Axis(2)) {
      for zi in z.iter_mut() {
        *zi = rng.sample(StandardNormal);
      }
      for i in 0..k {
        let mut acc = self.mu[i];
        for (j, zj) in z.iter().enumerate() {
          acc += self.factor[[i, j]] * zj;
        }
        cell[i] = acc;
      }
    }

    eps
  }
}

fn covariance(sigma: &Array1<f64>, cor: &Array2<f64>) -> Array2<f64> {
  let k = sigma.len();
  Array2::from_shape_fn((k, k), |(i, j)| sigma[i] * cor[[i, j]] * sigma[j])
}

/// Returns `L` with `L L^T = cov`: Cholesky when positive definite, a symmetric eigen factor when
/// only semi-definite.
fn factorise(cov: &Array2<f64>) -> Result<Array2<f64>> {
  let k = cov.nrows();
  let m = DMatrix::from_fn(k, k, |i, j| cov[[i, j]]);

  if let Some(chol) = m.clone().cholesky() {
    let l = chol.l();
    return Ok(Array2::from_shape_fn((k, k), |(i, j)| l[(i, j)]));
  }

  let eigen = SymmetricEigen::new(m);
  let scale = eigen.eigenvalues.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
  if let Some(min) = eigen
    .eigenvalues
    .iter()
    .copied()
    .find(|v| *v < -EIGEN_TOLERANCE * scale)
  {
    return Err(SimError::invalid(
      "cor",
      format!("covariance is not positive semi-definite (eigenvalue {min})"),
    ));
  }

  debug!(assets = k, "covariance is singular, using eigen factor");
  Ok(Array2::from_shape_fn((k, k), |(i, j)| {
    eigen.eigenvectors[(i, j)] * eigen.eigenvalues[j].max(0.0).sqrt()
  }))
}

/// Correlated innovations shaped `(N, sims, assets)` for multi-asset simulation.
///
/// `N = round(t / dt)`. Means default to zero. The draw is reproducible from `seed` alone.
pub fn generate_eps_mv(
  sigma: &[f64],
  cor: &Array2<f64>,
  t: f64,
  dt: f64,
  sims: usize,
  mu: Option<&[f64]>,
  seed: Option<u64>,
) -> Result<Array3<f64>> {
  let grid = Grid::resolve(t, Some(dt), sims, None)?;
  let cgns = CGNS::new(sigma, cor, mu)?;
  let mut rng = rng(seed);

  debug!(steps = grid.n, sims = grid.sims, assets = cgns.dim(), "generating correlated noise");
  Ok(cgns.sample_using(grid.n, grid.sims, &mut rng))
}

#[cfg(test)]
mod tests {
  use ndarray::array;
  use ndarray::s;

  use super::*;

  fn sample_cor(eps: &Array3<f64>, a: usize, b: usize) -> f64 {
    let x = eps.slice(s![.., .., a]);
    let y = eps.slice(s![.., .., b]);
    let mx = x.mean().unwrap();
    let my = y.mean().unwrap();
    let cov = x.iter().zip(y.iter()).map(|(x, y)| (x - mx) * (y - my)).sum::<f64>();
    let vx = x.iter().map(|x| (x - mx).powi(2)).sum::<f64>();
    let vy = y.iter().map(|y| (y - my).powi(2)).sum::<f64>();
    cov / (vx * vy).sqrt()
  }

  #[test]
  fn shape_is_steps_sims_assets() {
    let cor = array![[1.0, 0.5], [0.5, 1.0]];
    let eps = generate_eps_mv(&[0.2, 0.3], &cor, 1.0, 0.01, 10, None, Some(1)).unwrap();
    assert_eq!(eps.dim(), (100, 10, 2));
  }

  #[test]
  fn reproduces_target_covariance() {
    let cor = array![[1.0, 0.6], [0.6, 1.0]];
    let eps = generate_eps_mv(&[0.2, 0.4], &cor, 1.0, 1.0 / 252.0, 400, None, Some(11)).unwrap();

    let sd0 = eps.slice(s![.., .., 0]).std(1.0);
    let sd1 = eps.slice(s![.., .., 1]).std(1.0);
    assert!((sd0 - 0.2).abs() < 0.005, "sd0 = {sd0}");
    assert!((sd1 - 0.4).abs() < 0.01, "sd1 = {sd1}");
    let rho = sample_cor(&eps, 0, 1);
    assert!((rho - 0.6).abs() < 0.02, "rho = {rho}");
  }

  #[test]
  fn means_shift_the_draws() {
    let cor = Array2::eye(2);
    let eps = generate_eps_mv(&[1.0, 1.0], &cor, 1.0, 0.01, 500, Some(&[2.0, -1.0][..]), Some(3))
      .unwrap();
    assert!((eps.slice(s![.., .., 0]).mean().unwrap() - 2.0).abs() < 0.02);
    assert!((eps.slice(s![.., .., 1]).mean().unwrap() + 1.0).abs() < 0.02);
  }

  #[test]
  fn perfectly_correlated_assets_are_allowed() {
    let cor = array![[1.0, 1.0], [1.0, 1.0]];
    let eps = generate_eps_mv(&[1.0, 1.0], &cor, 1.0, 0.1, 50, None, Some(5)).unwrap();
    for cell in eps.lanes(Axis(2)) {
      assert!((cell[0] - cell[1]).abs() < 1e-8);
    }
  }

  #[test]
  fn non_square_cor_is_rejected() {
    let cor = Array2::<f64>::ones((2, 3));
    assert!(matches!(
      CGNS::new(&[0.1, 0.2], &cor, None),
      Err(SimError::InvalidValue { .. })
    ));
  }

  #[test]
  fn indefinite_cor_is_rejected() {
    let cor = array![[1.0, 0.9, -0.9], [0.9, 1.0, 0.9], [-0.9, 0.9, 1.0]];
    assert!(matches!(
      CGNS::new(&[0.1, 0.2, 0.3], &cor, None),
      Err(SimError::InvalidValue { .. })
    ));
  }

  #[test]
  fn sigma_and_cor_sizes_must_agree() {
    let cor = Array2::eye(3);
    assert!(matches!(
      CGNS::new(&[0.1, 0.2], &cor, None),
      Err(SimError::Shape { .. })
    ));
  }

  #[test]
  fn seed_fixes_the_draw() {
    let cor = array![[1.0, 0.3], [0.3, 1.0]];
    let a = generate_eps_mv(&[0.2, 0.3], &cor, 1.0, 0.1, 5, None, Some(9)).unwrap();
    let b = generate_eps_mv(&[0.2, 0.3], &cor, 1.0, 0.1, 5, None, Some(9)).unwrap();
    assert_eq!(a, b);
  }
}
