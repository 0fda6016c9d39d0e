//! Outbound email contract
//!
//! Dispatch may fail transiently and no delivery guarantee is assumed; the
//! billing core treats send failures as non-fatal and re-sendable.

use async_trait::async_trait;
use serde_json::json;

use crate::store::{StoreError, StoreResult};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> StoreResult<()>;
}

/// Resend API mailer.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> StoreResult<()> {
        if self.api_key.is_empty() {
            tracing::warn!(to = %to, subject = %subject, "Email not sent (RESEND_API_KEY not configured)");
            return Ok(());
        }

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html_body,
            }))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!("email HTTP {status}: {body}")));
        }

        tracing::info!(to = %to, subject = %subject, "Email dispatched");
        Ok(())
    }
}
