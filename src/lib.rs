//! Riverboat Backend Library
//!
//! The payout engine is standalone; the store and API wrap it for the
//! `riverboat` binary and the integration tests.

pub mod api;
pub mod config;
pub mod middleware;
pub mod models;
pub mod payouts;
pub mod store;

pub use payouts::{compute_payouts, CertaintyTable, PayoutError, PayoutTable};
