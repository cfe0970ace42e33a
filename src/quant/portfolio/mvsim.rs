//! # Multi-asset simulation facades
//!
//! $$
//! \text{history} \xrightarrow{\ \text{fit}\ } (s_0, \vartheta, R) \xrightarrow{\ \text{simulate}\ } S_{t,s,i}
//! $$
//!
use ndarray::Array2;
use tracing::debug;
use tracing::instrument;

use super::data::annualized_volatility;
use super::data::correlation_matrix;
use super::frontier::calculate_payoffs;
use super::frontier::generate_random_portfolio_weights;
use super::frontier::make_efficient_frontier_table;
use super::frontier::simulate_efficient_frontier;
use super::types::FrontierTable;
use super::types::PayoffFn;
use crate::error::Result;
use crate::error::SimError;
use crate::stats::ou_estimator::fit_ou_mv;
use crate::stats::ou_estimator::FitMethod;
use crate::stats::ou_estimator::OuFitTable;
use crate::stats::series::diff;
use crate::stats::series::last;
use crate::stats::series::log_returns;
use crate::stochastic::multivariate::gbm_mv::GbmMv;
use crate::stochastic::multivariate::ou_mv::OuMv;
use crate::stochastic::Backend;
use crate::traits::PathsMv;
use crate::traits::ProcessExt;

/// A basket model that can be calibrated, simulated and turned into a frontier.
pub trait MvSim {
  fn names(&self) -> &[String];

  /// Derives the simulation inputs from the model's own data.
  fn fit(&mut self) -> Result<()>;

  /// Paths shaped `(N + 1, sims, assets)`.
  fn simulate(&self, sims: usize, seed: Option<u64>) -> Result<PathsMv>;

  /// Simulates, reduces to payoffs and scores `portfolio_sims` random portfolios.
  fn efficient_frontier(
    &self,
    sims: usize,
    payoffs: Option<&[PayoffFn]>,
    portfolio_sims: usize,
    seed: Option<u64>,
  ) -> Result<FrontierTable> {
    let paths = self.simulate(sims, seed)?;
    let payoffs = calculate_payoffs(paths.view(), payoffs)?;
    let weights = generate_random_portfolio_weights(
      payoffs.ncols(),
      portfolio_sims,
      seed.map(|s| s.wrapping_add(1)),
    )?;
    let returns = simulate_efficient_frontier(payoffs.view(), weights.view())?;
    let names = self.names().iter().map(String::as_str).collect::<Vec<_>>();
    make_efficient_frontier_table(returns.view(), weights.view(), &names)
  }
}

/// Correlated GBM basket, given explicitly or calibrated from a price history.
#[derive(Clone, Debug)]
pub struct MvGbm {
  pub names: Vec<String>,
  pub s0: Option<Vec<f64>>,
  pub r: f64,
  pub sigma: Option<Vec<f64>>,
  pub cor: Option<Array2<f64>>,
  /// `time x assets`, sampled every `dt`
  pub prices: Option<Array2<f64>>,
  pub t: f64,
  pub dt: f64,
  pub backend: Backend,
}

impl MvGbm {
  pub fn new(
    names: Vec<String>,
    s0: Vec<f64>,
    r: f64,
    sigma: Vec<f64>,
    cor: Array2<f64>,
    t: f64,
    dt: f64,
  ) -> Self {
    Self {
      names,
      s0: Some(s0),
      r,
      sigma: Some(sigma),
      cor: Some(cor),
      prices: None,
      t,
      dt,
      backend: Backend::default(),
    }
  }

  pub fn from_prices(names: Vec<String>, prices: Array2<f64>, r: f64, t: f64, dt: f64) -> Self {
    Self {
      names,
      s0: None,
      r,
      sigma: None,
      cor: None,
      prices: Some(prices),
      t,
      dt,
      backend: Backend::default(),
    }
  }
}

impl MvSim for MvGbm {
  fn names(&self) -> &[String] {
    &self.names
  }

  #[instrument(name = "mv_gbm_fit", skip(self))]
  fn fit(&mut self) -> Result<()> {
    if let Some(prices) = &self.prices {
      let returns = log_returns(prices.view());
      let sigma = annualized_volatility(returns.view(), self.dt)?.to_vec();
      let cor = correlation_matrix(returns.view())?;
      let s0 = last(prices.view());
      debug!(assets = prices.ncols(), "calibrated GBM basket from prices");

      self.sigma = Some(sigma);
      self.cor = Some(cor);
      self.s0 = Some(s0);
      return Ok(());
    }

    if self.s0.is_none() || self.sigma.is_none() {
      return Err(SimError::Configuration(
        "GBM basket needs either a price history or s0 and sigma".into(),
      ));
    }
    Ok(())
  }

  fn simulate(&self, sims: usize, seed: Option<u64>) -> Result<PathsMv> {
    let (Some(s0), Some(sigma)) = (&self.s0, &self.sigma) else {
      return Err(SimError::Configuration("GBM basket is not fitted".into()));
    };

    GbmMv::new(
      s0.clone(),
      vec![self.r.into(); s0.len()],
      sigma.iter().map(|&s| s.into()).collect(),
      self.cor.clone(),
      self.t,
      Some(self.dt),
      sims,
      None,
      seed,
      self.backend,
    )
    .sample()
  }
}

/// Correlated OU basket calibrated from a price history.
#[derive(Clone, Debug)]
pub struct MvOu {
  pub names: Vec<String>,
  /// `time x assets`, sampled every `dt`
  pub prices: Array2<f64>,
  pub t: f64,
  pub dt: f64,
  pub method: FitMethod,
  pub backend: Backend,
  fitted: Option<FittedOu>,
}

#[derive(Clone, Debug)]
struct FittedOu {
  table: OuFitTable,
  s0: Vec<f64>,
  cor: Array2<f64>,
}

impl MvOu {
  pub fn new(names: Vec<String>, prices: Array2<f64>, t: f64, dt: f64, method: FitMethod) -> Self {
    Self {
      names,
      prices,
      t,
      dt,
      method,
      backend: Backend::default(),
      fitted: None,
    }
  }

  /// Per-asset fits, once [`MvSim::fit`] has run.
  pub fn fits(&self) -> Option<&OuFitTable> {
    self.fitted.as_ref().map(|f| &f.table)
  }
}

impl MvSim for MvOu {
  fn names(&self) -> &[String] {
    &self.names
  }

  #[instrument(name = "mv_ou_fit", skip(self), fields(method = ?self.method))]
  fn fit(&mut self) -> Result<()> {
    let names = self.names.iter().map(String::as_str).collect::<Vec<_>>();
    let table = fit_ou_mv(self.prices.view(), self.dt, self.method, Some(names.as_slice()))?;
    let cor = correlation_matrix(diff(self.prices.view()).view())?;
    let s0 = last(self.prices.view());

    self.fitted = Some(FittedOu { table, s0, cor });
    Ok(())
  }

  fn simulate(&self, sims: usize, seed: Option<u64>) -> Result<PathsMv> {
    let fitted = self
      .fitted
      .as_ref()
      .ok_or_else(|| SimError::Configuration("OU basket is not fitted".into()))?;
    let fits = &fitted.table.fits;

    OuMv::new(
      fitted.s0.clone(),
      fits.iter().map(|f| f.mu.into()).collect(),
      fits.iter().map(|f| f.theta.into()).collect(),
      fits.iter().map(|f| f.annualized_sigma.into()).collect(),
      Some(fitted.cor.clone()),
      self.t,
      Some(self.dt),
      sims,
      None,
      seed,
      false,
      self.backend,
    )
    .sample()
  }
}
