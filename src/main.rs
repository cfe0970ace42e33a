use anyhow::Context;
use anyhow::Result;
use ndarray::array;
use ndarray::Axis;
use stochastic_risk::quant::portfolio::MvOu;
use stochastic_risk::quant::portfolio::MvSim;
use stochastic_risk::stats::ou_estimator::fit_ou_mv;
use stochastic_risk::stats::ou_estimator::FitMethod;
use stochastic_risk::stochastic::multivariate::ou_mv::OuMv;
use stochastic_risk::stochastic::Backend;
use stochastic_risk::stochastic::DEFAULT_DT;
use stochastic_risk::traits::ProcessExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let names = ["wti", "brent", "henry_hub"];

  // Two years of daily history for a correlated energy basket
  let history = OuMv::new(
    vec![75.0, 80.0, 3.0],
    vec![70.0.into(), 74.0.into(), 3.2.into()],
    vec![6.0.into(), 5.0.into(), 12.0.into()],
    vec![18.0.into(), 17.0.into(), 1.5.into()],
    Some(array![[1.0, 0.9, 0.2], [0.9, 1.0, 0.2], [0.2, 0.2, 1.0]]),
    2.0,
    Some(DEFAULT_DT),
    1,
    None,
    Some(2024),
    false,
    Backend::Vectorized,
  )
  .sample()
  .context("simulating price history")?
  .index_axis(Axis(1), 0)
  .to_owned();

  for method in [FitMethod::Ols, FitMethod::Mle] {
    let table = fit_ou_mv(history.view(), DEFAULT_DT, method, Some(&names[..]))
      .with_context(|| format!("fitting {method:?}"))?;
    println!("{method:?}\n{table}");
  }

  let mut model = MvOu::new(
    names.iter().map(|n| n.to_string()).collect(),
    history,
    0.5,
    DEFAULT_DT,
    FitMethod::Ols,
  );
  model.fit().context("calibrating basket")?;

  let frontier = model
    .efficient_frontier(1_000, None, 20, Some(7))
    .context("building efficient frontier")?;
  println!("{frontier}");

  if let Some(i) = frontier.max_return_to_risk() {
    println!(
      "best return per unit risk: row {i}, risk {:.2}, expected {:.2}",
      frontier.risk[i], frontier.expected_return[i]
    );
  }

  Ok(())
}
