//! Entity-store collection names.
//!
//! The store addresses records by collection name only; these constants are
//! the single source of truth so a typo can't silently create a new
//! collection.

pub const PAYMENT_REQUESTS: &str = "payment_requests";
pub const PLANS: &str = "plans";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const PAYMENTS: &str = "payments";
pub const INVOICES: &str = "invoices";
pub const UPI_ACCOUNTS: &str = "upi_accounts";
pub const USERS: &str = "users";
