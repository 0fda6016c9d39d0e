//! Money arithmetic and invoice numbering
//!
//! All amounts are minor currency units (paise). GST is computed with
//! integer round-half-up so every caller reproduces the exact same figure.

use time::OffsetDateTime;

/// GST rate in basis points (18%).
pub const GST_BASIS_POINTS: i64 = 1_800;

/// GST on an amount, rounded half-up. Zero and negative amounts carry no tax.
pub fn gst_on(amount: i64) -> i64 {
    if amount <= 0 {
        return 0;
    }
    (amount * GST_BASIS_POINTS + 5_000) / 10_000
}

/// Format minor units as a rupee string, e.g. 14900 -> "Rs. 149.00".
pub fn format_inr(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.abs();
    format!("{}Rs. {}.{:02}", sign, minor / 100, minor % 100)
}

/// Generate an invoice number: timestamp plus a random hex suffix.
///
/// Practically unique across concurrent issuers; cryptographic uniqueness is
/// not a requirement.
pub fn invoice_number(now: OffsetDateTime) -> String {
    format!("INV-{}-{:04X}", now.unix_timestamp(), rand::random::<u16>())
}
