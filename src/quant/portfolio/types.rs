//! # Portfolio Types
//!
//! $$
//! \text{spread}_t = c + \sum_i w_i S^{(i)}_t
//! $$
//!
//! Shared containers for payoffs, spreads and the frontier table.

use std::fmt;

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView2;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;

/// Reduces one asset's `time x sims` paths to one payoff per simulation.
pub type PayoffFn = Box<dyn Fn(ArrayView2<'_, f64>) -> Array1<f64> + Send + Sync>;

/// Linear combination of asset prices plus a constant.
#[derive(Clone, Debug, PartialEq)]
pub struct Spread {
  pub name: String,
  /// One weight per asset, missing trailing assets weigh zero
  pub weights: Vec<f64>,
  pub constant: f64,
}

impl Spread {
  pub fn new(name: impl Into<String>, weights: Vec<f64>, constant: f64) -> Self {
    Self {
      name: name.into(),
      weights,
      constant,
    }
  }
}

/// Risk and expected return of every simulated portfolio, with its weights.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierTable {
  /// Asset names, one per weight column
  pub names: Vec<String>,
  /// Standard deviation of the portfolio payoff
  pub risk: Array1<f64>,
  /// Mean portfolio payoff
  pub expected_return: Array1<f64>,
  /// `portfolios x assets`
  pub weights: Array2<f64>,
}

impl FrontierTable {
  pub fn len(&self) -> usize {
    self.risk.len()
  }

  pub fn is_empty(&self) -> bool {
    self.risk.is_empty()
  }

  /// Row of the least risky portfolio.
  pub fn min_risk(&self) -> Option<usize> {
    argbest(&self.risk, |a, b| a < b)
  }

  /// Row with the best return per unit of risk.
  pub fn max_return_to_risk(&self) -> Option<usize> {
    let ratio = &self.expected_return / &self.risk;
    argbest(&ratio, |a, b| a > b)
  }

  pub fn to_table(&self) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new("Risk"), Cell::new("Expected Return")];
    header.extend(self.names.iter().map(|n| Cell::new(n)));
    table.set_titles(Row::new(header));

    for (i, w) in self.weights.rows().into_iter().enumerate() {
      let mut row = vec![
        Cell::new(&format!("{:.4}", self.risk[i])),
        Cell::new(&format!("{:.4}", self.expected_return[i])),
      ];
      row.extend(w.iter().map(|v| Cell::new(&format!("{v:.4}"))));
      table.add_row(Row::new(row));
    }

    table
  }
}

impl fmt::Display for FrontierTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_table())
  }
}

fn argbest(xs: &Array1<f64>, better: impl Fn(f64, f64) -> bool) -> Option<usize> {
  xs.iter()
    .enumerate()
    .filter(|(_, v)| v.is_finite())
    .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
      Some((_, b)) if !better(v, b) => best,
      _ => Some((i, v)),
    })
    .map(|(i, _)| i)
}
