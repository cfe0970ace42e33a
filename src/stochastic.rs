//! # Stochastic Process Simulation Modules
//!
//! `stochastic` simulates the processes used for commodity and spread risk: mean-reverting
//! prices, mean-reverting prices with jumps, lognormal prices, and correlated baskets of them.
//!
//! ## Modules
//!
//! | Module             | Description                                                                  |
//! |--------------------|------------------------------------------------------------------------------|
//! | [`param`]          | Scalar, time-varying and time-by-simulation parameters behind one accessor.  |
//! | [`noise`]          | Grid resolution, seeded generators, Gaussian, jump and correlated noise.     |
//! | [`diffusion`]      | Ornstein-Uhlenbeck and geometric Brownian motion.                            |
//! | [`jump`]           | Ornstein-Uhlenbeck with compound jumps and a mean-reversion lag.             |
//! | [`multivariate`]   | Per-asset wrappers driven by correlated noise.                               |
//!
//! ## Execution paths
//!
//! Every simulator carries a [`Backend`]. `Loop` walks each `(step, sim)` cell; `Vectorized`
//! advances a whole row of simulations with array arithmetic. For identical noise the two agree
//! to floating point tolerance.

pub mod diffusion;
pub mod jump;
pub mod multivariate;
pub mod noise;
pub mod param;

pub use crate::traits::ProcessExt;

/// Default step size: one business day.
pub const DEFAULT_DT: f64 = 1.0 / 252.0;
/// Default number of simulations
pub const SIMS: usize = 1000;

/// Execution path for a simulation call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
  /// Scalar recursion over every `(step, sim)` cell.
  #[default]
  Loop,
  /// Row-at-a-time array arithmetic over all simulations.
  Vectorized,
}

impl Backend {
  pub const ALL: [Backend; 2] = [Backend::Loop, Backend::Vectorized];
}
