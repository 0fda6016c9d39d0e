//! HTTP routes
//!
//! Admin routes sit behind a shared bearer token; payer-facing routes are
//! open. All handlers are thin wrappers over [`medialog_billing`] services.

pub mod admin;
pub mod public;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::{error::ApiError, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/payment-requests", get(admin::list_payment_requests))
        .route(
            "/payment-requests/{id}/approve",
            post(admin::approve_payment_request),
        )
        .route(
            "/payment-requests/{id}/reject",
            post(admin::reject_payment_request),
        )
        .route("/payment-requests/{id}", delete(admin::delete_payment_request))
        .route("/invoices/{id}/resend", post(admin::resend_invoice))
        .route("/upi-accounts", get(admin::list_upi_accounts))
        .route("/upi-accounts/{id}/primary", post(admin::set_primary_upi_account))
        .route(
            "/upi-accounts/reset-collections",
            post(admin::reset_upi_collections),
        )
        .route("/invariants", get(admin::check_invariants))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health))
        .route("/api/upi-accounts/presentable", get(public::presentable_upi_accounts))
        .nest("/api/admin", admin)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Shared-secret check for the admin console.
async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == state.config.admin_token => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use medialog_billing::{BillingService, IssuerInfo};
    use medialog_shared::collections;
    use medialog_shared::{
        Clock, DocumentStore, EntityStore, Mailer, MemoryStore, StoreResult, SystemClock,
    };

    struct NullDocs;

    #[async_trait::async_trait]
    impl DocumentStore for NullDocs {
        async fn upload(&self, _bytes: Vec<u8>, filename: &str) -> StoreResult<String> {
            Ok(format!("https://docs.test/{filename}"))
        }
    }

    struct NullMailer;

    #[async_trait::async_trait]
    impl Mailer for NullMailer {
        async fn send(&self, _to: &str, _subject: &str, _html: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    fn test_config() -> crate::config::Config {
        crate::config::Config {
            bind_address: "127.0.0.1:0".into(),
            store_url: "http://store.test".into(),
            store_token: "t".into(),
            docstore_upload_url: "http://docs.test/upload".into(),
            docstore_public_url: "http://docs.test".into(),
            docstore_token: String::new(),
            resend_api_key: String::new(),
            email_from: "billing@medialog.test".into(),
            admin_token: "secret-admin-token".into(),
            allowed_origins: "http://localhost:3000".into(),
            issuer: IssuerInfo {
                business_name: "Medialog".into(),
                address: String::new(),
                gstin: None,
                support_email: "support@medialog.test".into(),
            },
        }
    }

    async fn app_with_store() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let billing = Arc::new(BillingService::new(
            store.clone() as Arc<dyn EntityStore>,
            Arc::new(NullDocs) as Arc<dyn DocumentStore>,
            Arc::new(NullMailer) as Arc<dyn Mailer>,
            Arc::new(SystemClock) as Arc<dyn Clock>,
            test_config().issuer,
        ));
        let state = AppState::new(test_config(), billing);
        (create_router(state), store)
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _) = app_with_store().await;
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_routes_require_bearer_token() {
        let (app, _) = app_with_store().await;
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/admin/payment-requests")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_route_accepts_configured_token() {
        let (app, _) = app_with_store().await;
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/admin/payment-requests")
                    .header("authorization", "Bearer secret-admin-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, json!([]));
    }

    #[tokio::test]
    async fn presentable_selector_hides_internal_fields() {
        let (app, store) = app_with_store().await;
        store
            .seed(
                collections::UPI_ACCOUNTS,
                json!({
                    "id": "acc1",
                    "upi_id": "medialog@okaxis",
                    "display_name": "Main",
                    "is_primary": true,
                    "is_active": true,
                    "daily_limit": 500_000,
                    "collected_amount": 100,
                }),
            )
            .await;

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/upi-accounts/presentable")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed[0]["upi_id"], "medialog@okaxis");
        assert!(parsed[0].get("collected_amount").is_none());
        assert!(parsed[0].get("daily_limit").is_none());
    }

    #[tokio::test]
    async fn unknown_request_maps_to_404() {
        let (app, _) = app_with_store().await;
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/api/admin/payment-requests/ghost/approve")
                    .header("authorization", "Bearer secret-admin-token")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"reviewer_id":"admin1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
