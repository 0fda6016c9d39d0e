//! Remote entity store client
//!
//! Thin reqwest client for the hosted record store's REST API
//! (`/api/collections/{name}/records`). The backend assigns record ids and
//! performs top-level patch merges on update, matching the [`MemoryStore`]
//! semantics the tests run against.
//!
//! [`MemoryStore`]: crate::store::MemoryStore

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::store::{EntityStore, Filter, StoreError, StoreResult};

#[derive(Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl RemoteStore {
    pub fn new(base_url: &str, auth_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        }
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.records_url(collection), id)
    }

    /// Render the filter as the backend's equality expression syntax,
    /// e.g. `status='processing' && user_id='u42'`.
    fn filter_expr(filter: &Filter) -> String {
        filter
            .terms()
            .iter()
            .map(|(field, value)| match value {
                Value::String(s) => format!("{}='{}'", field, s.replace('\'', "\\'")),
                other => format!("{}={}", field, other),
            })
            .collect::<Vec<_>>()
            .join(" && ")
    }

    async fn check(&self, response: reqwest::Response) -> StoreResult<reqwest::Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(response.url().path().to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Backend(format!("HTTP {status}: {body}")))
            }
        }
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl EntityStore for RemoteStore {
    async fn create(&self, collection: &str, record: Value) -> StoreResult<Value> {
        let response = self
            .client
            .post(self.records_url(collection))
            .header("Authorization", &self.auth_token)
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        self.check(response).await?.json().await.map_err(transport)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let response = self
            .client
            .get(self.record_url(collection, id))
            .header("Authorization", &self.auth_token)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = self.check(response).await?.json().await.map_err(transport)?;
        Ok(Some(record))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<Value> {
        let response = self
            .client
            .patch(self.record_url(collection, id))
            .header("Authorization", &self.auth_token)
            .json(&patch)
            .send()
            .await
            .map_err(transport)?;
        self.check(response).await?.json().await.map_err(transport)
    }

    async fn filter(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let mut request = self
            .client
            .get(self.records_url(collection))
            .header("Authorization", &self.auth_token)
            .query(&[("perPage", "500")]);
        if !filter.terms().is_empty() {
            request = request.query(&[("filter", Self::filter_expr(filter))]);
        }
        let response = request.send().await.map_err(transport)?;
        let body: Value = self.check(response).await?.json().await.map_err(transport)?;
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| StoreError::Malformed("list response missing items".to_string()))?;
        Ok(items)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let response = self
            .client
            .delete(self.record_url(collection, id))
            .header("Authorization", &self.auth_token)
            .send()
            .await
            .map_err(transport)?;
        self.check(response).await?;
        Ok(())
    }
}
