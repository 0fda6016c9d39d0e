// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! medialog Billing Module
//!
//! The payment verification -> subscription activation -> invoice issuance
//! pipeline behind the admin console.
//!
//! ## Features
//!
//! - **Approval Workflow**: review manually-submitted payment proofs as a
//!   saga over the transactionless entity store
//! - **Subscription Activation**: deterministic validity-window arithmetic
//!   per billing cycle
//! - **Invoice Service**: render, upload, persist and email billing
//!   documents with GST
//! - **UPI Account Selection**: daily-cap aware receiving-account rotation
//! - **Invariants**: read-only reconciliation checks for saga gaps

pub mod activation;
pub mod approval;
pub mod email;
pub mod error;
pub mod invariants;
pub mod invoice;
pub mod money;
pub mod upi;


// Approval
pub use approval::{ApprovalOutcome, ApprovalService};

// Email
pub use email::BillingEmailService;

// Error
pub use error::{BillingError, BillingResult};

// Invariants
pub use invariants::{
    InvariantCheckSummary, InvariantChecker, InvariantViolation, ViolationSeverity,
};

// Invoice
pub use invoice::{InvoiceService, IssuedInvoice, IssuerInfo};

// UPI
pub use upi::UpiAccountService;

use std::sync::Arc;

use medialog_shared::{Clock, DocumentStore, EntityStore, Mailer};

/// Main billing service that combines all billing functionality.
pub struct BillingService {
    pub approval: ApprovalService,
    pub invoices: InvoiceService,
    pub upi: UpiAccountService,
    pub invariants: InvariantChecker,
}

impl BillingService {
    /// Wire up the billing services around the four collaborators.
    pub fn new(
        store: Arc<dyn EntityStore>,
        documents: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        issuer: IssuerInfo,
    ) -> Self {
        let email = BillingEmailService::new(mailer, &issuer.support_email);
        let invoices = InvoiceService::new(
            store.clone(),
            documents,
            email,
            clock.clone(),
            issuer,
        );
        let upi = UpiAccountService::new(store.clone());
        let approval =
            ApprovalService::new(store.clone(), invoices.clone(), upi.clone(), clock);

        Self {
            approval,
            invoices,
            upi,
            invariants: InvariantChecker::new(store),
        }
    }
}
