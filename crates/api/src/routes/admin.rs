//! Admin console routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use medialog_billing::{ApprovalOutcome, InvariantCheckSummary};
use medialog_shared::{PaymentRequest, UpiAccount};

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
}

pub async fn list_payment_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> ApiResult<Json<Vec<PaymentRequest>>> {
    let requests = state.billing.approval.list(query.status.as_deref()).await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub reviewer_id: String,
}

pub async fn approve_payment_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ApproveBody>,
) -> ApiResult<Json<ApprovalOutcome>> {
    tracing::info!(request_id = %id, reviewer_id = %body.reviewer_id, "Approval requested");
    let outcome = state.billing.approval.approve(&id, &body.reviewer_id).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reviewer_id: String,
    pub reason: String,
}

pub async fn reject_payment_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> ApiResult<Json<Value>> {
    tracing::info!(request_id = %id, reviewer_id = %body.reviewer_id, "Rejection requested");
    state
        .billing
        .approval
        .reject(&id, &body.reviewer_id, &body.reason)
        .await?;
    Ok(Json(json!({"status": "rejected", "request_id": id})))
}

pub async fn delete_payment_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.billing.approval.delete(&id).await?;
    Ok(Json(json!({"status": "deleted", "request_id": id})))
}

pub async fn resend_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let invoice = state.billing.invoices.resend(&id).await?;
    Ok(Json(json!({
        "status": "sent",
        "invoice_id": invoice.id,
        "invoice_number": invoice.invoice_number,
    })))
}

pub async fn list_upi_accounts(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UpiAccount>>> {
    let accounts = state.billing.upi.list().await?;
    Ok(Json(accounts))
}

pub async fn set_primary_upi_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UpiAccount>> {
    let account = state.billing.upi.set_primary(&id).await?;
    Ok(Json(account))
}

pub async fn reset_upi_collections(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let touched = state.billing.upi.reset_collections().await?;
    Ok(Json(json!({"status": "reset", "accounts_touched": touched})))
}

pub async fn check_invariants(
    State(state): State<AppState>,
) -> ApiResult<Json<InvariantCheckSummary>> {
    let summary = state.billing.invariants.run_all_checks().await?;
    Ok(Json(summary))
}
