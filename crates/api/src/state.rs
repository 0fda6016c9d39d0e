//! Application state

use std::sync::Arc;

use medialog_billing::BillingService;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub billing: Arc<BillingService>,
}

impl AppState {
    pub fn new(config: Config, billing: Arc<BillingService>) -> Self {
        Self { config, billing }
    }
}
