//! Billing error taxonomy
//!
//! Four classes matter to callers:
//! - `Validation` / `Conflict`: local, non-retryable, reported immediately
//!   with no mutation applied.
//! - `NotFound`: a referenced record is missing; fatal to the operation but
//!   anything committed before the lookup stays committed.
//! - `Transient`: render/upload/email failures; retryable, never rolls back
//!   already-committed state.

use medialog_shared::StoreError;

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Bad caller input (e.g. empty rejection reason).
    #[error("validation error: {0}")]
    Validation(String),

    /// Record is not in the state the operation requires.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Plan record cannot drive billing (unknown cycle, malformed fields).
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Entity store backend failure.
    #[error("store error: {0}")]
    Store(String),

    /// Stored record does not match its schema.
    #[error("malformed record: {0}")]
    Serialization(String),

    /// Retryable I/O failure (document upload, email dispatch).
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for BillingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => BillingError::NotFound(what),
            StoreError::Backend(msg) => BillingError::Store(msg),
            StoreError::Malformed(msg) => BillingError::Serialization(msg),
        }
    }
}

/// Deserialize a store record into its typed schema, tagging errors with the
/// collection for debuggability.
pub fn decode<T: serde::de::DeserializeOwned>(
    collection: &str,
    value: serde_json::Value,
) -> BillingResult<T> {
    serde_json::from_value(value)
        .map_err(|e| BillingError::Serialization(format!("{collection}: {e}")))
}
