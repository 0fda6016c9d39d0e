//! Invoice issuance
//!
//! Renders the billing document, uploads it, persists the invoice record and
//! dispatches the summary email, in that order. An upload failure aborts
//! before any invoice record exists (no record beats a dangling document
//! reference); an email failure after the record is persisted is reported on
//! the result so admins can resend.

use std::sync::Arc;

use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use medialog_shared::{
    collections, BillingCycle, Clock, DocumentStore, EntityStore, Invoice, InvoiceStatus, Plan,
    Subscription, SubscriptionStatus, User,
};

use crate::email::BillingEmailService;
use crate::error::{decode, BillingError, BillingResult};
use crate::money::{format_inr, gst_on, invoice_number};

/// Issuer block rendered at the top of every invoice.
#[derive(Debug, Clone)]
pub struct IssuerInfo {
    pub business_name: String,
    pub address: String,
    pub gstin: Option<String>,
    pub support_email: String,
}

/// Result of issuing an invoice.
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub invoice: Invoice,
    /// False when the record was persisted but the email could not be
    /// delivered; the invoice is eligible for [`InvoiceService::resend`].
    pub email_sent: bool,
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn EntityStore>,
    documents: Arc<dyn DocumentStore>,
    email: BillingEmailService,
    clock: Arc<dyn Clock>,
    issuer: IssuerInfo,
}

fn retry_strategy() -> impl Iterator<Item = std::time::Duration> {
    ExponentialBackoff::from_millis(10).map(jitter).take(3)
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        documents: Arc<dyn DocumentStore>,
        email: BillingEmailService,
        clock: Arc<dyn Clock>,
        issuer: IssuerInfo,
    ) -> Self {
        Self {
            store,
            documents,
            email,
            clock,
            issuer,
        }
    }

    /// Issue an invoice for an activated (or trial) subscription.
    ///
    /// Trial status comes from the plan's cycle or the subscription snapshot;
    /// trial invoices always carry a zero amount and zero tax regardless of
    /// the plan's nominal price. A concrete payment reference marks the
    /// invoice `paid`, otherwise it is `issued`.
    pub async fn issue(
        &self,
        subscription: &Subscription,
        plan: &Plan,
        user: &User,
        payment_ref: Option<&str>,
    ) -> BillingResult<IssuedInvoice> {
        let is_trial = plan.billing_cycle == BillingCycle::Trial
            || subscription.status == SubscriptionStatus::Trial;
        let amount = if is_trial { 0 } else { plan.price };
        let tax = gst_on(amount);
        let total = amount + tax;

        let now = self.clock.now();
        let number = invoice_number(now);
        let status = if payment_ref.is_some() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Issued
        };

        let html = render_document(
            &self.issuer,
            &number,
            user,
            subscription,
            plan,
            amount,
            tax,
            total,
            status,
            payment_ref,
            now,
        );

        // Upload first: no invoice record may reference a document that was
        // never stored.
        let filename = format!("{number}.html");
        let bytes = html.into_bytes();
        let document_url = Retry::spawn(retry_strategy(), || {
            self.documents.upload(bytes.clone(), &filename)
        })
        .await
        .map_err(|e| BillingError::Transient(format!("document upload failed: {e}")))?;

        let issued_at = now
            .format(&Rfc3339)
            .map_err(|e| BillingError::Internal(e.to_string()))?;
        let record = self
            .store
            .create(
                collections::INVOICES,
                json!({
                    "invoice_number": number,
                    "user_id": subscription.user_id,
                    "subscription_id": subscription.id,
                    "amount": amount,
                    "tax": tax,
                    "total": total,
                    "currency": "INR",
                    "status": status.as_str(),
                    "document_url": document_url,
                    "period_start": subscription.start_date.to_string(),
                    "period_end": subscription.end_date.to_string(),
                    "payment_method": "upi",
                    "transaction_ref": payment_ref,
                    "issued_at": issued_at,
                }),
            )
            .await?;
        let invoice: Invoice = decode(collections::INVOICES, record)?;

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            subscription_id = %subscription.id,
            total = invoice.total,
            status = invoice.status.as_str(),
            "Invoice persisted"
        );

        let email_sent = match Retry::spawn(retry_strategy(), || {
            self.email.send_invoice(user, &invoice)
        })
        .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    invoice_number = %invoice.invoice_number,
                    user_email = %user.email,
                    error = %e,
                    "Invoice email delivery failed; invoice persisted and can be resent"
                );
                false
            }
        };

        Ok(IssuedInvoice {
            invoice,
            email_sent,
        })
    }

    /// Re-dispatch the email for an already-persisted invoice.
    pub async fn resend(&self, invoice_id: &str) -> BillingResult<Invoice> {
        let record = self
            .store
            .get(collections::INVOICES, invoice_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("invoice {invoice_id}")))?;
        let invoice: Invoice = decode(collections::INVOICES, record)?;

        let user_record = self
            .store
            .get(collections::USERS, &invoice.user_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("user {}", invoice.user_id)))?;
        let user: User = decode(collections::USERS, user_record)?;

        Retry::spawn(retry_strategy(), || self.email.send_invoice(&user, &invoice)).await?;
        tracing::info!(
            invoice_number = %invoice.invoice_number,
            user_email = %user.email,
            "Invoice email resent"
        );
        Ok(invoice)
    }
}

/// Render the fixed-layout invoice document.
#[allow(clippy::too_many_arguments)]
fn render_document(
    issuer: &IssuerInfo,
    number: &str,
    user: &User,
    subscription: &Subscription,
    plan: &Plan,
    amount: i64,
    tax: i64,
    total: i64,
    status: InvoiceStatus,
    payment_ref: Option<&str>,
    issued_at: OffsetDateTime,
) -> String {
    let gstin_line = issuer
        .gstin
        .as_deref()
        .map(|g| format!("<div>GSTIN: {g}</div>"))
        .unwrap_or_default();
    let reference_line = payment_ref
        .map(|r| format!("<div>Transaction ref: {r}</div>"))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Invoice {number}</title></head>
<body style="font-family: sans-serif; max-width: 720px; margin: 0 auto;">
  <header style="border-bottom: 2px solid #333; padding-bottom: 12px;">
    <h1 style="margin: 0;">{business}</h1>
    <div>{address}</div>
    {gstin_line}
  </header>

  <section style="margin-top: 16px;">
    <h2 style="margin: 0;">Invoice {number}</h2>
    <div>Date: {date}</div>
    <div>Status: {status}</div>
    <div>Payment method: UPI</div>
    {reference_line}
  </section>

  <section style="margin-top: 16px;">
    <h3 style="margin: 0;">Bill to</h3>
    <div>{user_name}</div>
    <div>{user_email}</div>
  </section>

  <section style="margin-top: 16px;">
    <h3 style="margin: 0;">Subscription</h3>
    <div>Plan: {plan_name} ({cycle})</div>
    <div>Billing period: {period_start} to {period_end}</div>
  </section>

  <table style="width: 100%; margin-top: 16px; border-collapse: collapse;" border="1" cellpadding="8">
    <tr><th align="left">Description</th><th align="right">Amount</th></tr>
    <tr><td>{plan_name} subscription, {period_start} to {period_end}</td><td align="right">{amount_fmt}</td></tr>
  </table>

  <table style="margin-top: 8px; margin-left: auto;" cellpadding="4">
    <tr><td>Subtotal</td><td align="right">{amount_fmt}</td></tr>
    <tr><td>GST (18%)</td><td align="right">{tax_fmt}</td></tr>
    <tr><td><strong>Total</strong></td><td align="right"><strong>{total_fmt}</strong></td></tr>
  </table>

  <footer style="margin-top: 24px; border-top: 1px solid #ccc; padding-top: 8px; color: #666; font-size: 12px;">
    For support, contact {support}.
  </footer>
</body>
</html>"#,
        number = number,
        business = issuer.business_name,
        address = issuer.address,
        gstin_line = gstin_line,
        date = issued_at.date(),
        status = status.as_str(),
        reference_line = reference_line,
        user_name = user.name,
        user_email = user.email,
        plan_name = plan.name,
        cycle = plan.billing_cycle.as_str(),
        period_start = subscription.start_date,
        period_end = subscription.end_date,
        amount_fmt = format_inr(amount),
        tax_fmt = format_inr(tax),
        total_fmt = format_inr(total),
        support = issuer.support_email,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use medialog_shared::SubscriptionStatus;
    use time::macros::{date, datetime};

    fn issuer() -> IssuerInfo {
        IssuerInfo {
            business_name: "Medialog Media Pvt Ltd".into(),
            address: "42 MG Road, Bengaluru".into(),
            gstin: Some("29ABCDE1234F1Z5".into()),
            support_email: "support@medialog.app".into(),
        }
    }

    fn fixture() -> (User, Subscription, Plan) {
        let user = User {
            id: "u1".into(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
        };
        let subscription = Subscription {
            id: "s1".into(),
            user_id: "u1".into(),
            plan_id: "p1".into(),
            status: SubscriptionStatus::Active,
            start_date: date!(2024 - 01 - 15),
            end_date: date!(2024 - 02 - 15),
            admin_notes: None,
        };
        let plan = Plan {
            id: "p1".into(),
            name: "Premium Monthly".into(),
            price: 14_900,
            billing_cycle: BillingCycle::Monthly,
            trial_days: None,
        };
        (user, subscription, plan)
    }

    #[test]
    fn document_has_every_layout_block() {
        let (user, subscription, plan) = fixture();
        let html = render_document(
            &issuer(),
            "INV-1-0001",
            &user,
            &subscription,
            &plan,
            14_900,
            2_682,
            17_582,
            InvoiceStatus::Paid,
            Some("UTR123"),
            datetime!(2024-01-15 10:00 UTC),
        );

        assert!(html.contains("Medialog Media Pvt Ltd"));
        assert!(html.contains("GSTIN: 29ABCDE1234F1Z5"));
        assert!(html.contains("Invoice INV-1-0001"));
        assert!(html.contains("Bill to"));
        assert!(html.contains("asha@example.com"));
        assert!(html.contains("2024-01-15 to 2024-02-15"));
        assert!(html.contains("GST (18%)"));
        assert!(html.contains("Rs. 175.82"));
        assert!(html.contains("Transaction ref: UTR123"));
        assert!(html.contains("support@medialog.app"));
    }

    #[test]
    fn document_omits_optional_lines_when_absent() {
        let (user, subscription, plan) = fixture();
        let mut no_gstin = issuer();
        no_gstin.gstin = None;
        let html = render_document(
            &no_gstin,
            "INV-1-0002",
            &user,
            &subscription,
            &plan,
            14_900,
            2_682,
            17_582,
            InvoiceStatus::Issued,
            None,
            datetime!(2024-01-15 10:00 UTC),
        );
        assert!(!html.contains("GSTIN"));
        assert!(!html.contains("Transaction ref"));
        assert!(html.contains("Status: issued"));
    }
}
