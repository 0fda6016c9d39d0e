//! Domain record types
//!
//! Every record stored in the entity store has an explicit schema here.
//! Status fields are closed enums; the store holds their snake_case string
//! form and deserialization rejects anything outside the enum.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Review status of a payment request.
///
/// Transitions are processing -> approved or processing -> rejected, exactly
/// once; the approval workflow is the only code allowed to perform them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRequestStatus {
    Processing,
    Approved,
    Rejected,
}

impl PaymentRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRequestStatus::Processing => "processing",
            PaymentRequestStatus::Approved => "approved",
            PaymentRequestStatus::Rejected => "rejected",
        }
    }

    /// A request can only be reviewed while it is still processing.
    pub fn is_reviewable(&self) -> bool {
        matches!(self, PaymentRequestStatus::Processing)
    }
}

/// A user's claim, with proof, of having paid for a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub subscription_id: String,
    /// Amount in minor currency units (paise).
    pub amount: i64,
    /// External reference supplied by the payer (UTR / transaction id).
    #[serde(default)]
    pub reference_id: Option<String>,
    /// Pointer to the uploaded proof-of-payment document.
    #[serde(default)]
    pub proof: Option<String>,
    pub status: PaymentRequestStatus,
    /// Receiving account the payer was shown, if captured at submission.
    #[serde(default)]
    pub upi_account_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    /// Required iff status is rejected.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// How a plan's validity window is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Trial,
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Trial => "trial",
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

/// A billing offering. Read-only for the approval workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Price in minor currency units (paise).
    pub price: i64,
    pub billing_cycle: BillingCycle,
    /// Trial length in days; defaults to 7 when unset.
    #[serde(default)]
    pub trial_days: Option<i64>,
}

/// Entitlement status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Rejected,
    Expired,
    PaymentFailed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Rejected => "rejected",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::PaymentFailed => "payment_failed",
        }
    }
}

/// A user's entitlement window.
///
/// The end date is always derived from the start date and the plan's billing
/// cycle at activation time; nothing else computes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Immutable ledger record of money received. Created once per approval,
/// never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub subscription_id: String,
    /// The payment request this payment settles. Doubles as the idempotency
    /// key for retried approvals.
    pub request_id: String,
    pub amount: i64,
    pub method: String,
    pub reference: String,
    #[serde(with = "time::serde::rfc3339")]
    pub paid_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Issued,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
        }
    }
}

/// Persisted metadata of an issued billing document. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub user_id: String,
    pub subscription_id: String,
    /// Net amount in minor units; 0 for trial invoices.
    pub amount: i64,
    pub tax: i64,
    pub total: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    /// Address of the rendered document in the document store.
    pub document_url: String,
    pub period_start: String,
    pub period_end: String,
    pub payment_method: String,
    #[serde(default)]
    pub transaction_ref: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

/// A receiving payment account shown to payers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpiAccount {
    pub id: String,
    /// The UPI VPA, e.g. `medialog@okaxis`.
    pub upi_id: String,
    pub display_name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Daily collection cap in minor units; no cap when unset.
    #[serde(default)]
    pub daily_limit: Option<i64>,
    /// Running total collected today, maintained by the approval workflow.
    #[serde(default)]
    pub collected_amount: i64,
}

fn default_true() -> bool {
    true
}

impl UpiAccount {
    /// An account is presentable until its running total reaches the cap.
    pub fn is_under_limit(&self) -> bool {
        match self.daily_limit {
            Some(limit) => self.collected_amount < limit,
            None => true,
        }
    }
}

/// Minimal user projection for bill-to blocks and email delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}
