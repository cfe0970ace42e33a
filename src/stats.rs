//! # Stats
//!
//! $$
//! \hat\vartheta = \arg\max_\vartheta \sum_t \ln p_\vartheta(S_t \mid S_{t-1})
//! $$
//!
pub mod ou_estimator;
pub mod series;
