//! # OU Estimator
//!
//! $$
//! S_{t} = a + b\,S_{t-1} + \epsilon_t,\qquad
//! \hat\theta = -\frac{\ln \hat b}{\Delta t},\quad \hat\mu = \frac{\hat a}{1-\hat b},\quad
//! \hat\sigma = \frac{\hat\sigma_\epsilon}{\sqrt{\Delta t}}
//! $$
//!
//! The likelihood estimator maximises the exact transition density
//!
//! $$
//! S_t \mid S_{t-1} \sim \mathcal N\!\left(\mu + (S_{t-1}-\mu)e^{-\theta\Delta t},\
//! \frac{\sigma^2}{2\theta}\big(1-e^{-2\theta\Delta t}\big)\right)
//! $$
//!
use std::f64::consts::LN_2;
use std::fmt;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use linreg::linear_regression;
use ndarray::Array1;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use rayon::prelude::*;
use statrs::distribution::Continuous;
use statrs::distribution::Normal;
use tracing::debug;
use tracing::instrument;

use crate::error::Result;
use crate::error::SimError;

/// Minimum number of finite observations for a fit.
pub const MIN_OBSERVATIONS: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitMethod {
  /// Lag-one regression
  #[default]
  Ols,
  /// Exact Gaussian transition likelihood
  Mle,
}

/// Fitted OU parameters on an annual scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OuFit {
  pub theta: f64,
  pub mu: f64,
  pub annualized_sigma: f64,
  /// `ln 2 / theta`, in years
  pub half_life: f64,
}

impl OuFit {
  fn new(theta: f64, mu: f64, annualized_sigma: f64) -> Self {
    Self {
      theta,
      mu,
      annualized_sigma,
      half_life: LN_2 / theta,
    }
  }
}

/// Relative size below which a residual spread counts as zero.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Fits an OU process to one series sampled every `dt` years.
///
/// Leading and trailing non-finite runs, such as the NaN rows left by a shift, are trimmed. A gap
/// inside the series would pair observations more than `dt` apart and is rejected.
#[instrument(skip(series), fields(len = series.len()))]
pub fn fit_ou(series: ArrayView1<'_, f64>, dt: f64, method: FitMethod) -> Result<OuFit> {
  if !(dt.is_finite() && dt > 0.0) {
    return Err(SimError::invalid("dt", format!("step must be positive, got {dt}")));
  }

  let xs = trim_non_finite(series)?;
  if xs.len() < MIN_OBSERVATIONS {
    return Err(SimError::InsufficientData {
      required: MIN_OBSERVATIONS,
      provided: xs.len(),
    });
  }

  let fit = match method {
    FitMethod::Ols => fit_ols(&xs, dt)?,
    FitMethod::Mle => fit_mle(&xs, dt)?,
  };

  debug!(?method, theta = fit.theta, mu = fit.mu, sigma = fit.annualized_sigma, "fitted OU");
  Ok(fit)
}

fn trim_non_finite(series: ArrayView1<'_, f64>) -> Result<Vec<f64>> {
  let xs = series.iter().copied().collect::<Vec<_>>();
  let Some(start) = xs.iter().position(|x| x.is_finite()) else {
    return Ok(Vec::new());
  };
  let end = xs.iter().rposition(|x| x.is_finite()).map_or(start, |i| i + 1);

  if let Some(i) = xs[start..end].iter().position(|x| !x.is_finite()) {
    return Err(SimError::invalid(
      "series",
      format!("non-finite observation at row {} inside the series", start + i),
    ));
  }

  Ok(xs[start..end].to_vec())
}

/// Smallest per-step spread accepted for a series on the scale of `xs`.
fn variance_floor(xs: &[f64]) -> f64 {
  VARIANCE_FLOOR * xs.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

fn fit_ols(xs: &[f64], dt: f64) -> Result<OuFit> {
  let (lagged, current) = (&xs[..xs.len() - 1], &xs[1..]);
  let (b, a): (f64, f64) = linear_regression(lagged, current)
    .map_err(|e| SimError::Numerical(format!("lag regression failed: {e:?}")))?;

  if !(b > 0.0 && b < 1.0) {
    return Err(SimError::Numerical(format!(
      "lag coefficient {b} outside (0, 1), series is not mean reverting"
    )));
  }

  let residuals = lagged
    .iter()
    .zip(current)
    .map(|(x, y)| y - (a + b * x))
    .collect::<Array1<f64>>();
  let sd = residuals.std(0.0);
  if !(sd > variance_floor(xs)) {
    return Err(SimError::Numerical("residual variance is not positive".into()));
  }

  Ok(OuFit::new(-b.ln() / dt, a / (1.0 - b), sd / dt.sqrt()))
}

/// Negative log-likelihood over `(ln theta, mu, ln sigma)`.
struct OuLikelihood<'a> {
  xs: &'a [f64],
  dt: f64,
}

impl OuLikelihood<'_> {
  fn nll(&self, theta: f64, mu: f64, sigma: f64) -> f64 {
    let decay = (-theta * self.dt).exp();
    let var = sigma * sigma * -(-2.0 * theta * self.dt).exp_m1() / (2.0 * theta);
    let Ok(normal) = Normal::new(0.0, var.sqrt()) else {
      return f64::INFINITY;
    };

    -self
      .xs
      .windows(2)
      .map(|w| normal.ln_pdf(w[1] - (mu + (w[0] - mu) * decay)))
      .sum::<f64>()
  }
}

impl CostFunction for OuLikelihood<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let nll = self.nll(x[0].exp(), x[1], x[2].exp());
    Ok(if nll.is_finite() { nll } else { f64::INFINITY })
  }
}

fn fit_mle(xs: &[f64], dt: f64) -> Result<OuFit> {
  let series = ArrayView1::from(xs);
  let mean = series.mean().unwrap_or(0.0);
  let sd = series.std(0.0);

  let lagged = ArrayView1::from(&xs[..xs.len() - 1]);
  let current = ArrayView1::from(&xs[1..]);
  let (dl, dc) = (&lagged - mean, &current - mean);
  let rho = dl.dot(&dc) / dl.dot(&dl);
  let theta0 = if rho > 0.0 && rho < 1.0 { -rho.ln() / dt } else { 1.0 };

  let floor = variance_floor(xs);
  let diffs = &current - &lagged;
  let step_sd = diffs.std(0.0);
  if !(step_sd > floor) {
    return Err(SimError::Numerical("series has no variation to fit".into()));
  }
  let sigma0 = step_sd / dt.sqrt();

  let x0 = vec![theta0.ln(), mean, sigma0.ln()];
  let steps = [0.5, sd.max(1e-8), 0.5];
  let mut simplex = vec![x0.clone()];
  for (i, step) in steps.iter().enumerate() {
    let mut point = x0.clone();
    point[i] += step;
    simplex.push(point);
  }

  let solver = NelderMead::new(simplex)
    .with_sd_tolerance(1e-10)
    .map_err(|e| SimError::Numerical(e.to_string()))?;
  let res = Executor::new(OuLikelihood { xs, dt }, solver)
    .configure(|state| state.max_iters(5000))
    .run()
    .map_err(|e| SimError::Numerical(e.to_string()))?;

  let best = res.state.best_param.unwrap_or(x0);
  let (theta, mu, sigma) = (best[0].exp(), best[1], best[2].exp());
  if !(theta.is_finite() && mu.is_finite() && sigma.is_finite()) {
    return Err(SimError::Numerical("likelihood optimisation diverged".into()));
  }
  if !(sigma * dt.sqrt() > floor) {
    return Err(SimError::Numerical("fitted variance is not positive".into()));
  }

  Ok(OuFit::new(theta, mu, sigma))
}

/// Fits of several series side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct OuFitTable {
  pub names: Vec<String>,
  pub fits: Vec<OuFit>,
}

impl OuFitTable {
  pub fn get(&self, name: &str) -> Option<&OuFit> {
    self.names.iter().position(|n| n == name).map(|i| &self.fits[i])
  }

  pub fn to_table(&self) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new("")];
    header.extend(self.names.iter().map(|n| Cell::new(n)));
    table.set_titles(Row::new(header));

    let rows: [(&str, fn(&OuFit) -> f64); 3] = [
      ("theta", |f| f.theta),
      ("annualized_sigma", |f| f.annualized_sigma),
      ("mu", |f| f.mu),
    ];
    for (label, value) in rows {
      let mut row = vec![Cell::new(label)];
      row.extend(self.fits.iter().map(|f| Cell::new(&format!("{:.6}", value(f)))));
      table.add_row(Row::new(row));
    }

    table
  }
}

impl fmt::Display for OuFitTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_table())
  }
}

/// Fits every column of a `time x assets` frame. Columns are named `0, 1, ...` unless `names` is
/// given.
pub fn fit_ou_mv(
  df: ArrayView2<'_, f64>,
  dt: f64,
  method: FitMethod,
  names: Option<&[&str]>,
) -> Result<OuFitTable> {
  let cols = df.ncols();
  let names = match names {
    Some(names) if names.len() != cols => {
      return Err(SimError::shape("names", cols, names.len()));
    }
    Some(names) => names.iter().map(|n| n.to_string()).collect(),
    None => (0..cols).map(|i| i.to_string()).collect(),
  };

  let fits = df
    .axis_iter(Axis(1))
    .collect::<Vec<_>>()
    .into_par_iter()
    .map(|col| fit_ou(col, dt, method))
    .collect::<Result<Vec<_>>>()?;

  Ok(OuFitTable { names, fits })
}
