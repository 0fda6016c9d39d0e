//! Document store contract
//!
//! Blob storage for rendered invoice documents. Uploads may fail transiently;
//! callers decide on retry policy.

use async_trait::async_trait;

use crate::store::{StoreError, StoreResult};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upload a document and return its publicly addressable URL.
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> StoreResult<String>;
}

/// reqwest-backed document store client.
///
/// Uploads via multipart POST to the blob service; the public URL is derived
/// from the configured public base, which may be a CDN in front of the
/// service.
#[derive(Clone)]
pub struct RemoteDocumentStore {
    client: reqwest::Client,
    upload_url: String,
    public_base_url: String,
    auth_token: String,
}

impl RemoteDocumentStore {
    pub fn new(upload_url: &str, public_base_url: &str, auth_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for RemoteDocumentStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> StoreResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/html")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .header("Authorization", &self.auth_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!("upload HTTP {status}: {body}")));
        }

        Ok(format!("{}/{}", self.public_base_url, filename))
    }
}
