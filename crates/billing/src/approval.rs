//! Payment approval workflow
//!
//! The review of a manually-submitted payment proof. Approval is a saga over
//! a store with no multi-record transactions: each step is a separately
//! committed write, and the status transition is written first so it acts as
//! the claim token: a concurrent or retried approval observes `approved`
//! and aborts with a conflict instead of re-applying side effects.

use std::sync::Arc;

use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::Date;

use medialog_shared::{
    collections, Clock, EntityStore, Filter, Payment, PaymentRequest, Plan, Subscription,
    SubscriptionStatus, User,
};

use crate::activation::{activation_start, compute_new_window};
use crate::error::{decode, BillingError, BillingResult};
use crate::invoice::InvoiceService;
use crate::upi::UpiAccountService;

/// What an approval produced.
///
/// `warnings` carries the non-fatal failures (invoice issuance, email
/// delivery, collection counter) that are surfaced for reconciliation
/// instead of failing the already-committed approval.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApprovalOutcome {
    pub request_id: String,
    pub payment_id: String,
    pub subscription_id: String,
    pub start_date: Date,
    pub end_date: Date,
    pub invoice_number: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn EntityStore>,
    invoices: InvoiceService,
    upi: UpiAccountService,
    clock: Arc<dyn Clock>,
}

impl ApprovalService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        invoices: InvoiceService,
        upi: UpiAccountService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            invoices,
            upi,
            clock,
        }
    }

    async fn fetch_request(&self, request_id: &str) -> BillingResult<PaymentRequest> {
        let record = self
            .store
            .get(collections::PAYMENT_REQUESTS, request_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("payment request {request_id}")))?;
        decode(collections::PAYMENT_REQUESTS, record)
    }

    /// Approve a payment request.
    ///
    /// Step order is load-bearing: status transition (claim), payment
    /// record, plan lookup, subscription activation, then the best-effort
    /// tail (invoice, collection counter). A failure after the claim leaves
    /// the request `approved` with the gap visible to the invariant checker.
    ///
    /// Approving a trial-cycle plan lands the subscription on `trial`, not
    /// `active`; the zero-amount invoice path keys off that status.
    pub async fn approve(
        &self,
        request_id: &str,
        reviewer_id: &str,
    ) -> BillingResult<ApprovalOutcome> {
        let request = self.fetch_request(request_id).await?;
        if !request.status.is_reviewable() {
            return Err(BillingError::Conflict(format!(
                "payment request {request_id} is already {}",
                request.status.as_str()
            )));
        }

        let now = self.clock.now();
        let reviewed_at = now
            .format(&Rfc3339)
            .map_err(|e| BillingError::Internal(e.to_string()))?;

        // Step 1: claim. Everything downstream happens after this write so a
        // concurrent attempt sees `approved` and conflicts.
        self.store
            .update(
                collections::PAYMENT_REQUESTS,
                request_id,
                json!({
                    "status": "approved",
                    "reviewed_at": reviewed_at,
                    "reviewed_by": reviewer_id,
                }),
            )
            .await?;
        tracing::info!(request_id = %request_id, reviewer_id = %reviewer_id, "Payment request approved");

        // Step 2: immutable payment record. The request id is the
        // idempotency key; a crashed-and-rerun approval must not double
        // the ledger.
        let reference = request
            .reference_id
            .clone()
            .unwrap_or_else(|| request.id.clone());
        let existing = self
            .store
            .filter(
                collections::PAYMENTS,
                &Filter::new().eq("request_id", request_id),
            )
            .await?;
        let payment: Payment = match existing.into_iter().next() {
            Some(record) => {
                tracing::warn!(request_id = %request_id, "Payment already recorded for request, skipping create");
                decode(collections::PAYMENTS, record)?
            }
            None => {
                let record = self
                    .store
                    .create(
                        collections::PAYMENTS,
                        json!({
                            "user_id": request.user_id,
                            "subscription_id": request.subscription_id,
                            "request_id": request.id,
                            "amount": request.amount,
                            "method": "upi",
                            "reference": reference,
                            "paid_at": reviewed_at,
                        }),
                    )
                    .await?;
                decode(collections::PAYMENTS, record)?
            }
        };
        tracing::info!(
            request_id = %request_id,
            payment_id = %payment.id,
            amount = payment.amount,
            "Payment recorded"
        );

        // Step 3: plan lookup. Missing plan is fatal; billing must never
        // proceed on an undefined cycle. The subscription has not been
        // touched yet.
        let plan_record = self
            .store
            .get(collections::PLANS, &request.plan_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("plan {}", request.plan_id)))?;
        let plan: Plan = serde_json::from_value(plan_record)
            .map_err(|e| BillingError::InvalidPlan(format!("plan {}: {e}", request.plan_id)))?;

        // Step 4: compute and persist the new validity window.
        let sub_record = self
            .store
            .get(collections::SUBSCRIPTIONS, &request.subscription_id)
            .await?
            .ok_or_else(|| {
                BillingError::NotFound(format!("subscription {}", request.subscription_id))
            })?;
        let subscription: Subscription = decode(collections::SUBSCRIPTIONS, sub_record)?;

        let start = activation_start(&subscription, now.date());
        let (start, end) = compute_new_window(&plan, start)?;
        let status = match plan.billing_cycle {
            medialog_shared::BillingCycle::Trial => SubscriptionStatus::Trial,
            _ => SubscriptionStatus::Active,
        };
        let updated = self
            .store
            .update(
                collections::SUBSCRIPTIONS,
                &subscription.id,
                json!({
                    "status": status.as_str(),
                    "start_date": start.to_string(),
                    "end_date": end.to_string(),
                }),
            )
            .await?;
        let subscription: Subscription = decode(collections::SUBSCRIPTIONS, updated)?;
        tracing::info!(
            subscription_id = %subscription.id,
            start_date = %start,
            end_date = %end,
            "Subscription activated"
        );

        // Step 5: best-effort tail. Failures here are logged and surfaced,
        // never rolled back into steps 1-4.
        let mut warnings = Vec::new();

        let invoice_number = match self.lookup_user(&request.user_id).await {
            Ok(user) => {
                match self
                    .invoices
                    .issue(&subscription, &plan, &user, Some(&payment.reference))
                    .await
                {
                    Ok(issued) => {
                        if !issued.email_sent {
                            warnings.push(format!(
                                "invoice {} persisted but email delivery failed",
                                issued.invoice.invoice_number
                            ));
                        }
                        Some(issued.invoice.invoice_number)
                    }
                    Err(e) => {
                        tracing::error!(
                            request_id = %request_id,
                            subscription_id = %subscription.id,
                            error = %e,
                            "RECONCILIATION NEEDED: approval committed but invoice issuance failed"
                        );
                        warnings.push(format!("invoice issuance failed: {e}"));
                        None
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    user_id = %request.user_id,
                    error = %e,
                    "RECONCILIATION NEEDED: approval committed but billed user could not be loaded"
                );
                warnings.push(format!("invoice skipped, user lookup failed: {e}"));
                None
            }
        };

        if let Some(account_id) = &request.upi_account_id {
            if let Err(e) = self.upi.record_collection(account_id, request.amount).await {
                tracing::error!(
                    request_id = %request_id,
                    account_id = %account_id,
                    error = %e,
                    "Failed to record collection against UPI account"
                );
                warnings.push(format!("collection counter update failed: {e}"));
            }
        }

        Ok(ApprovalOutcome {
            request_id: request.id,
            payment_id: payment.id,
            subscription_id: subscription.id,
            start_date: start,
            end_date: end,
            invoice_number,
            warnings,
        })
    }

    /// Reject a payment request with a reason.
    ///
    /// An empty reason is a validation error with zero writes. Rejection
    /// marks the subscription as rejected and files the reason in its admin
    /// notes; no payment and no invoice are created.
    pub async fn reject(
        &self,
        request_id: &str,
        reviewer_id: &str,
        reason: &str,
    ) -> BillingResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BillingError::Validation(
                "rejection reason must not be empty".to_string(),
            ));
        }

        let request = self.fetch_request(request_id).await?;
        if !request.status.is_reviewable() {
            return Err(BillingError::Conflict(format!(
                "payment request {request_id} is already {}",
                request.status.as_str()
            )));
        }

        let reviewed_at = self
            .clock
            .now()
            .format(&Rfc3339)
            .map_err(|e| BillingError::Internal(e.to_string()))?;

        self.store
            .update(
                collections::PAYMENT_REQUESTS,
                request_id,
                json!({
                    "status": "rejected",
                    "rejection_reason": reason,
                    "reviewed_at": reviewed_at,
                    "reviewed_by": reviewer_id,
                }),
            )
            .await?;

        self.store
            .update(
                collections::SUBSCRIPTIONS,
                &request.subscription_id,
                json!({
                    "status": "rejected",
                    "admin_notes": reason,
                }),
            )
            .await?;

        tracing::info!(
            request_id = %request_id,
            reviewer_id = %reviewer_id,
            reason = %reason,
            "Payment request rejected"
        );
        Ok(())
    }

    /// Permanently remove a payment request, whatever its status.
    ///
    /// Record-hygiene operation: no cascade to payments, invoices or
    /// subscriptions that earlier reviews created.
    pub async fn delete(&self, request_id: &str) -> BillingResult<()> {
        self.store
            .delete(collections::PAYMENT_REQUESTS, request_id)
            .await?;
        tracing::info!(request_id = %request_id, "Payment request deleted");
        Ok(())
    }

    /// List payment requests, optionally narrowed to one status.
    pub async fn list(&self, status: Option<&str>) -> BillingResult<Vec<PaymentRequest>> {
        let filter = match status {
            Some(s) => Filter::new().eq("status", s),
            None => Filter::new(),
        };
        let records = self
            .store
            .filter(collections::PAYMENT_REQUESTS, &filter)
            .await?;
        records
            .into_iter()
            .map(|r| decode(collections::PAYMENT_REQUESTS, r))
            .collect()
    }

    async fn lookup_user(&self, user_id: &str) -> BillingResult<User> {
        let record = self
            .store
            .get(collections::USERS, user_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("user {user_id}")))?;
        decode(collections::USERS, record)
    }
}
