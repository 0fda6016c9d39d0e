//! Billing email composition and dispatch.

use std::sync::Arc;

use medialog_shared::{Invoice, InvoiceStatus, Mailer, User};

use crate::error::{BillingError, BillingResult};
use crate::money::format_inr;

#[derive(Clone)]
pub struct BillingEmailService {
    mailer: Arc<dyn Mailer>,
    support_email: String,
}

impl BillingEmailService {
    pub fn new(mailer: Arc<dyn Mailer>, support_email: &str) -> Self {
        Self {
            mailer,
            support_email: support_email.to_string(),
        }
    }

    /// Send the invoice summary email with a link to the rendered document.
    pub async fn send_invoice(&self, user: &User, invoice: &Invoice) -> BillingResult<()> {
        let subject = format!("Your medialog invoice {}", invoice.invoice_number);
        let html = self.invoice_email_html(user, invoice);
        self.mailer
            .send(&user.email, &subject, &html)
            .await
            .map_err(|e| BillingError::Transient(e.to_string()))
    }

    fn invoice_email_html(&self, user: &User, invoice: &Invoice) -> String {
        let status_line = match invoice.status {
            InvoiceStatus::Paid => "This invoice has been paid in full. No action is needed.",
            InvoiceStatus::Issued => "This invoice has been issued for your subscription.",
        };
        format!(
            r#"<div style="font-family: sans-serif; max-width: 600px;">
  <h2>Invoice {number}</h2>
  <p>Hi {name},</p>
  <p>{status_line}</p>
  <table cellpadding="6">
    <tr><td>Billing period</td><td>{period_start} &ndash; {period_end}</td></tr>
    <tr><td>Amount</td><td>{amount}</td></tr>
    <tr><td>GST (18%)</td><td>{tax}</td></tr>
    <tr><td><strong>Total</strong></td><td><strong>{total}</strong></td></tr>
  </table>
  <p><a href="{url}">View your invoice</a></p>
  <p style="color: #666; font-size: 12px;">Questions? Write to {support}.</p>
</div>"#,
            number = invoice.invoice_number,
            name = user.name,
            status_line = status_line,
            period_start = invoice.period_start,
            period_end = invoice.period_end,
            amount = format_inr(invoice.amount),
            tax = format_inr(invoice.tax),
            total = format_inr(invoice.total),
            url = invoice.document_url,
            support = self.support_email,
        )
    }
}
