#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! medialog shared crate
//!
//! Domain record types, status enums, and the four external collaborator
//! contracts the billing core depends on:
//!
//! - **EntityStore**: generic record persistence (collection-name addressed,
//!   eventually consistent, no multi-record transactions)
//! - **DocumentStore**: blob upload for rendered invoice documents
//! - **Mailer**: outbound email dispatch
//! - **Clock**: injectable time source
//!
//! Production implementations are thin reqwest clients; an in-memory
//! `MemoryStore` is provided for tests.

pub mod clock;
pub mod collections;
pub mod docstore;
pub mod mail;
pub mod remote;
pub mod store;
pub mod types;

// Clock
pub use clock::{Clock, FixedClock, SystemClock};

// Document store
pub use docstore::{DocumentStore, RemoteDocumentStore};

// Mailer
pub use mail::{Mailer, ResendMailer};

// Entity store
pub use remote::RemoteStore;
pub use store::{EntityStore, Filter, MemoryStore, StoreError, StoreResult};

// Domain types
pub use types::{
    BillingCycle, Invoice, InvoiceStatus, Payment, PaymentRequest, PaymentRequestStatus, Plan,
    Subscription, SubscriptionStatus, UpiAccount, User,
};
