//! # Portfolio
//!
//! $$
//! \sigma_p = \operatorname{sd}\big(P\mathbf{w}\big),\qquad \bar R_p = \operatorname{mean}\big(P\mathbf{w}\big)
//! $$
//!
//! Simulated payoffs per asset, random long-only weights and the frontier they trace out.

pub mod data;
pub mod frontier;
pub mod mvsim;
pub mod spread;
pub mod types;

pub use data::correlation_matrix;
pub use frontier::calculate_payoffs;
pub use frontier::generate_random_portfolio_weights;
pub use frontier::make_efficient_frontier_table;
pub use frontier::simulate_efficient_frontier;
pub use mvsim::MvGbm;
pub use mvsim::MvOu;
pub use mvsim::MvSim;
pub use spread::calc_spread_mv;
pub use types::FrontierTable;
pub use types::PayoffFn;
pub use types::Spread;
