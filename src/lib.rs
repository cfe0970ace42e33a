//! # stochastic-risk
//!
//! Monte Carlo simulation and calibration of mean-reverting and jump-diffusion processes for
//! commodity and financial risk.
//!
//! | Module                | Description                                                            |
//! |-----------------------|------------------------------------------------------------------------|
//! | [`stochastic`]        | OU, OU with jumps, GBM, correlated noise and multi-asset wrappers.     |
//! | [`stats`]             | OU estimators (OLS and MLE) and series helpers.                         |
//! | [`quant`]             | Payoffs, random portfolios and the simulated efficient frontier.       |
//! | [`error`]             | [`SimError`] and the crate `Result`.                                    |
//!
//! ```rust
//! use stochastic_risk::stochastic::diffusion::ou::OU;
//! use stochastic_risk::stochastic::Backend;
//! use stochastic_risk::traits::ProcessExt;
//!
//! let ou = OU::new(
//!   5.0, 4.0.into(), 2.0.into(), 0.32.into(), 1.0, Some(1.0 / 252.0), 100, None, Some(42), false,
//!   Backend::Loop,
//! );
//! let paths = ou.sample()?;
//! ```

pub mod error;
pub mod quant;
pub mod stats;
pub mod stochastic;
pub mod traits;

pub use error::Result;
pub use error::SimError;
