use std::sync::{Arc, Mutex};

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use housecall::config::AppConfig;
use housecall::db;
use housecall::handlers;
use housecall::services::gateway::stripe::StripeGateway;
use housecall::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    anyhow::ensure!(
        !config.gateway_secret_key.is_empty(),
        "GATEWAY_SECRET_KEY must be set"
    );
    if config.gateway_webhook_secret.is_empty() {
        tracing::warn!("GATEWAY_WEBHOOK_SECRET not set, all gateway webhooks will be rejected");
    }

    let conn = db::init_db(&config.database_url)?;
    let gateway = StripeGateway::new(config.gateway_secret_key.clone())?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        gateway: Box::new(gateway),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/services", get(handlers::services::list_services))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route("/api/bookings/:id", patch(handlers::bookings::patch_booking))
        .route("/api/payments/intent", post(handlers::payments::create_intent))
        .route(
            "/api/payments/confirm",
            post(handlers::payments::confirm_intent),
        )
        .route("/webhook/payments", post(handlers::webhook::payment_webhook))
        .route("/webhook/voice", post(handlers::webhook::voice_webhook))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route("/api/admin/services", post(handlers::admin::create_service))
        .route(
            "/api/admin/services/:id/deactivate",
            post(handlers::admin::deactivate_service),
        )
        .route(
            "/api/admin/payments/:id/refund",
            post(handlers::admin::refund_payment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
