//! Billing invariants
//!
//! Runnable consistency checks covering the gap the saga leaves open: the
//! approval's writes are separately committed, so a crash between steps
//! produces detectable (and manually repairable) inconsistencies rather
//! than silent ones.
//!
//! Checks only read, never write.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;

use medialog_shared::{
    collections, EntityStore, Filter, Invoice, PaymentRequest, PaymentRequestStatus, Subscription,
    SubscriptionStatus, UpiAccount,
};

use crate::error::BillingResult;

/// Result of a single failed invariant check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Which invariant was violated.
    pub invariant: String,
    /// Record(s) affected.
    pub record_ids: Vec<String>,
    /// Human-readable description of the violation.
    pub description: String,
    pub severity: ViolationSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Money may be wrong.
    Critical,
    /// Data inconsistency that needs attention.
    High,
    /// Potential issue, should investigate.
    Medium,
    /// Minor inconsistency, informational.
    Low,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSeverity::Critical => write!(f, "CRITICAL"),
            ViolationSeverity::High => write!(f, "HIGH"),
            ViolationSeverity::Medium => write!(f, "MEDIUM"),
            ViolationSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Summary of a full checker run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheckSummary {
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
    pub checks_run: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub violations: Vec<InvariantViolation>,
    pub healthy: bool,
}

pub struct InvariantChecker {
    store: Arc<dyn EntityStore>,
}

/// Decode a collection leniently: a record that no longer matches its schema
/// is itself a violation, not a reason to abort the run.
fn decode_all<T: serde::de::DeserializeOwned>(
    collection: &str,
    records: Vec<Value>,
    violations: &mut Vec<InvariantViolation>,
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(records.len());
    for record in records {
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("(no id)")
            .to_string();
        match serde_json::from_value(record) {
            Ok(value) => decoded.push(value),
            Err(e) => violations.push(InvariantViolation {
                invariant: "record_matches_schema".to_string(),
                record_ids: vec![id],
                description: format!("{collection} record does not match its schema: {e}"),
                severity: ViolationSeverity::High,
            }),
        }
    }
    decoded
}

impl InvariantChecker {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Run all invariant checks and return a summary.
    pub async fn run_all_checks(&self) -> BillingResult<InvariantCheckSummary> {
        let now = OffsetDateTime::now_utc();
        let mut violations = Vec::new();

        let requests: Vec<PaymentRequest> = decode_all(
            collections::PAYMENT_REQUESTS,
            self.store
                .filter(collections::PAYMENT_REQUESTS, &Filter::new())
                .await?,
            &mut violations,
        );
        let payments = self
            .store
            .filter(collections::PAYMENTS, &Filter::new())
            .await?;
        let subscriptions: Vec<Subscription> = decode_all(
            collections::SUBSCRIPTIONS,
            self.store
                .filter(collections::SUBSCRIPTIONS, &Filter::new())
                .await?,
            &mut violations,
        );
        let invoices: Vec<Invoice> = decode_all(
            collections::INVOICES,
            self.store
                .filter(collections::INVOICES, &Filter::new())
                .await?,
            &mut violations,
        );
        let accounts: Vec<UpiAccount> = decode_all(
            collections::UPI_ACCOUNTS,
            self.store
                .filter(collections::UPI_ACCOUNTS, &Filter::new())
                .await?,
            &mut violations,
        );

        violations.extend(check_approved_has_payment(&requests, &payments));
        violations.extend(check_approved_subscription_active(&requests, &subscriptions));
        violations.extend(check_rejected_has_reason(&requests));
        violations.extend(check_subscription_window_ordered(&subscriptions));
        violations.extend(check_invoice_has_document(&invoices));
        violations.extend(check_single_primary_account(&accounts));
        violations.extend(check_collections_within_limit(&accounts));

        let checks_run = Self::available_checks().len();
        let checks_failed = violations
            .iter()
            .map(|v| &v.invariant)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let checks_passed = checks_run.saturating_sub(checks_failed);

        Ok(InvariantCheckSummary {
            checked_at: now,
            checks_run,
            checks_passed,
            checks_failed,
            healthy: violations.is_empty(),
            violations,
        })
    }

    /// Names of all checks the full run performs.
    pub fn available_checks() -> Vec<&'static str> {
        vec![
            "approved_request_has_payment",
            "approved_request_subscription_active",
            "rejected_request_has_reason",
            "subscription_window_ordered",
            "invoice_has_document",
            "single_primary_upi_account",
            "collections_within_daily_limit",
        ]
    }
}

/// Invariant 1: every approved request has a payment ledger record.
///
/// A missing payment means the saga was cut down between the claim write and
/// the ledger write.
fn check_approved_has_payment(
    requests: &[PaymentRequest],
    payments: &[Value],
) -> Vec<InvariantViolation> {
    requests
        .iter()
        .filter(|r| r.status == PaymentRequestStatus::Approved)
        .filter(|r| {
            !payments
                .iter()
                .any(|p| p.get("request_id").and_then(Value::as_str) == Some(r.id.as_str()))
        })
        .map(|r| InvariantViolation {
            invariant: "approved_request_has_payment".to_string(),
            record_ids: vec![r.id.clone()],
            description: format!(
                "Payment request {} is approved but no payment record exists",
                r.id
            ),
            severity: ViolationSeverity::Critical,
        })
        .collect()
}

/// Invariant 2: an approved request's subscription is active (or on trial
/// for trial plans).
fn check_approved_subscription_active(
    requests: &[PaymentRequest],
    subscriptions: &[Subscription],
) -> Vec<InvariantViolation> {
    requests
        .iter()
        .filter(|r| r.status == PaymentRequestStatus::Approved)
        .filter_map(|r| {
            let sub = subscriptions.iter().find(|s| s.id == r.subscription_id)?;
            match sub.status {
                SubscriptionStatus::Active | SubscriptionStatus::Trial => None,
                other => Some(InvariantViolation {
                    invariant: "approved_request_subscription_active".to_string(),
                    record_ids: vec![r.id.clone(), sub.id.clone()],
                    description: format!(
                        "Request {} is approved but subscription {} is {}",
                        r.id,
                        sub.id,
                        other.as_str()
                    ),
                    severity: ViolationSeverity::High,
                }),
            }
        })
        .collect()
}

/// Invariant 3: rejected requests carry a reason.
fn check_rejected_has_reason(requests: &[PaymentRequest]) -> Vec<InvariantViolation> {
    requests
        .iter()
        .filter(|r| r.status == PaymentRequestStatus::Rejected)
        .filter(|r| {
            r.rejection_reason
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        })
        .map(|r| InvariantViolation {
            invariant: "rejected_request_has_reason".to_string(),
            record_ids: vec![r.id.clone()],
            description: format!("Payment request {} is rejected without a reason", r.id),
            severity: ViolationSeverity::Medium,
        })
        .collect()
}

/// Invariant 4: subscription windows are ordered (end on or after start).
fn check_subscription_window_ordered(subscriptions: &[Subscription]) -> Vec<InvariantViolation> {
    subscriptions
        .iter()
        .filter(|s| s.end_date < s.start_date)
        .map(|s| InvariantViolation {
            invariant: "subscription_window_ordered".to_string(),
            record_ids: vec![s.id.clone()],
            description: format!(
                "Subscription {} ends {} before it starts {}",
                s.id, s.end_date, s.start_date
            ),
            severity: ViolationSeverity::High,
        })
        .collect()
}

/// Invariant 5: every invoice references a stored document.
fn check_invoice_has_document(invoices: &[Invoice]) -> Vec<InvariantViolation> {
    invoices
        .iter()
        .filter(|i| i.document_url.trim().is_empty())
        .map(|i| InvariantViolation {
            invariant: "invoice_has_document".to_string(),
            record_ids: vec![i.id.clone()],
            description: format!("Invoice {} has no document reference", i.invoice_number),
            severity: ViolationSeverity::High,
        })
        .collect()
}

/// Invariant 6: at most one active account is flagged primary.
fn check_single_primary_account(accounts: &[UpiAccount]) -> Vec<InvariantViolation> {
    let primaries: Vec<&UpiAccount> = accounts
        .iter()
        .filter(|a| a.is_active && a.is_primary)
        .collect();
    if primaries.len() <= 1 {
        return Vec::new();
    }
    vec![InvariantViolation {
        invariant: "single_primary_upi_account".to_string(),
        record_ids: primaries.iter().map(|a| a.id.clone()).collect(),
        description: format!("{} active accounts are flagged primary", primaries.len()),
        severity: ViolationSeverity::High,
    }]
}

/// Invariant 7: a counter past its cap means approvals kept landing on an
/// account that should no longer have been presented.
fn check_collections_within_limit(accounts: &[UpiAccount]) -> Vec<InvariantViolation> {
    accounts
        .iter()
        .filter(|a| {
            a.daily_limit
                .map(|limit| a.collected_amount > limit)
                .unwrap_or(false)
        })
        .map(|a| InvariantViolation {
            invariant: "collections_within_daily_limit".to_string(),
            record_ids: vec![a.id.clone()],
            description: format!(
                "Account {} collected {} over its daily limit {:?}",
                a.id, a.collected_amount, a.daily_limit
            ),
            severity: ViolationSeverity::Low,
        })
        .collect()
}
