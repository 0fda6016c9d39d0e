//! Payer-facing routes

use axum::{extract::State, Json};
use serde::Serialize;

use medialog_shared::UpiAccount;

use crate::{error::ApiResult, state::AppState};

/// Payer-safe projection of a receiving account. Collection totals and caps
/// stay internal.
#[derive(Debug, Serialize)]
pub struct PresentableUpiAccount {
    pub id: String,
    pub upi_id: String,
    pub display_name: String,
    pub is_primary: bool,
}

impl From<UpiAccount> for PresentableUpiAccount {
    fn from(account: UpiAccount) -> Self {
        Self {
            id: account.id,
            upi_id: account.upi_id,
            display_name: account.display_name,
            is_primary: account.is_primary,
        }
    }
}

pub async fn presentable_upi_accounts(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PresentableUpiAccount>>> {
    let accounts = state.billing.upi.select_presentable().await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}
