//! API server configuration, loaded from environment variables.

use medialog_billing::IssuerInfo;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Base URL of the record store.
    pub store_url: String,
    /// Service token for the record store.
    pub store_token: String,
    /// Upload endpoint of the document blob service.
    pub docstore_upload_url: String,
    /// Public base URL invoice links are built from.
    pub docstore_public_url: String,
    /// Service token for the document blob service.
    pub docstore_token: String,
    /// Resend API key; empty disables outbound email.
    pub resend_api_key: String,
    /// From address for billing email.
    pub email_from: String,
    /// Bearer token required on all /api/admin routes.
    pub admin_token: String,
    /// Comma-separated CORS origin allowlist.
    pub allowed_origins: String,
    /// Seller identity printed on invoices.
    pub issuer: IssuerInfo,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            store_url: require("STORE_URL")?,
            store_token: require("STORE_TOKEN")?,
            docstore_upload_url: require("DOCSTORE_UPLOAD_URL")?,
            docstore_public_url: require("DOCSTORE_PUBLIC_URL")?,
            docstore_token: std::env::var("DOCSTORE_TOKEN").unwrap_or_default(),
            resend_api_key: std::env::var("RESEND_API_KEY").unwrap_or_default(),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "billing@medialog.app".to_string()),
            admin_token: require("ADMIN_API_TOKEN")?,
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string()),
            issuer: IssuerInfo {
                business_name: std::env::var("BUSINESS_NAME")
                    .unwrap_or_else(|_| "Medialog".to_string()),
                address: std::env::var("BUSINESS_ADDRESS").unwrap_or_default(),
                gstin: std::env::var("BUSINESS_GSTIN").ok().filter(|v| !v.is_empty()),
                support_email: std::env::var("SUPPORT_EMAIL")
                    .unwrap_or_else(|_| "support@medialog.app".to_string()),
            },
        })
    }
}

fn require(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("missing required environment variable {name}"))
}
