//! medialog API Server
//!
//! Serves the admin console endpoints for payment review, invoice issuance
//! and UPI receiving-account administration.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medialog_api::{create_router, AppState, Config};
use medialog_billing::BillingService;
use medialog_shared::{
    Clock, DocumentStore, EntityStore, Mailer, RemoteDocumentStore, RemoteStore, ResendMailer,
    SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,medialog_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting medialog API server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Wire up the external collaborators
    let store: Arc<dyn EntityStore> =
        Arc::new(RemoteStore::new(&config.store_url, &config.store_token));
    let documents: Arc<dyn DocumentStore> = Arc::new(RemoteDocumentStore::new(
        &config.docstore_upload_url,
        &config.docstore_public_url,
        &config.docstore_token,
    ));
    let mailer = ResendMailer::new(&config.resend_api_key, &config.email_from);
    if !mailer.is_enabled() {
        tracing::warn!("RESEND_API_KEY not set - invoice email delivery disabled");
    }
    let mailer: Arc<dyn Mailer> = Arc::new(mailer);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let billing = Arc::new(BillingService::new(
        store,
        documents,
        mailer,
        clock,
        config.issuer.clone(),
    ));
    let state = AppState::new(config.clone(), billing);

    // Explicit origin allowlist
    let allowed_origins: Vec<axum::http::HeaderValue> = config
        .allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    tracing::info!(
        allowed_origins = ?allowed_origins,
        "CORS configured with {} allowed origins",
        allowed_origins.len()
    );
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    let app = create_router(state).layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
