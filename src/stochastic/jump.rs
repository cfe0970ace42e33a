//! # Jump
//!
//! $$
//! dX_t=a(t,X_t)dt+b(t,X_t)dW_t+dJ_t
//! $$
//!
pub mod ouj;
