// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! medialog API Library
//!
//! HTTP surface for the billing pipeline: admin console routes for payment
//! review and invoice operations, plus the payer-facing UPI account selector.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
