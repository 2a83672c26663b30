//! JSON bodies specific to the gateway.
//!
//! Ledger records travel in the same JSON format the client library uses;
//! see [`tb_bridge::Account`] and [`tb_bridge::Transfer`].

mod types;

pub use types::{ErrorResponse, HealthResponse};
