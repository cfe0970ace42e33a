//! # Quant
//!
//! $$
//! R_p = \mathbf{w}^\top \mathbf{P}
//! $$
//!
//! Payoff reduction, random portfolios and the simulated efficient frontier on top of the
//! multi-asset simulators.
//!
pub mod portfolio;
