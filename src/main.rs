//! Triage Sentinel - Security Incident Triage Backend
//!
//! Classifies telemetry-derived alerts as true / false / benign positives
//! with a gradient-boosted tree model, explains each verdict with exact
//! TreeSHAP attributions, and attaches remediation guidance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      TRIAGE SENTINEL                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────────┐   ┌─────────────┐  │
//! │  │  API      │──▶│  Inference Pipeline  │   │  Knowledge  │  │
//! │  │  (Axum)   │   │  schema → align →    │   │  Base (RAG) │  │
//! │  └─────┬─────┘   │  classify → explain  │   └──────▲──────┘  │
//! │        │         │  (+ fallback policy) │          │         │
//! │        │         └──────────────────────┘          │         │
//! │        └──────────▶ Triage Orchestrator ───────────┘         │
//! │                            │                                 │
//! │                     ┌──────▼──────┐                          │
//! │                     │ Alert Store │                          │
//! │                     └─────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod models;
mod handlers;
mod logic;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::advice::AdviceClient;
use logic::alerts::AlertStore;
use logic::pipeline::InferencePipeline;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging (JSON lines in production)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "triage_sentinel=debug,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Triage Sentinel starting ({})", config.environment);

    // Inference pipeline: schema now, model lazily unless eager
    let pipeline = Arc::new(InferencePipeline::new(config.artifact_locator()));
    if config.eager_model_load {
        let warm = pipeline.clone();
        tokio::task::spawn_blocking(move || warm.warm_up()).await?;
    }
    let status = pipeline.status();
    tracing::info!(
        features = status.schema.feature_count,
        model = ?status.model,
        explainer = ?status.explainer,
        "Inference pipeline ready"
    );

    let advice = AdviceClient::new(config.advice_config())?;
    if !advice.is_configured() {
        tracing::info!("RAG_SERVICE_URL not set, remediation uses the built-in playbook");
    }

    // Build application state
    let state = AppState {
        pipeline,
        alerts: Arc::new(AlertStore::new(config.alert_store_capacity)),
        advice: Arc::new(advice),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    pub alerts: Arc<AlertStore>,
    pub advice: Arc<AdviceClient>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let inference_routes = Router::new()
        .route("/api/predict", post(handlers::inference::predict))
        .route("/api/explain", post(handlers::inference::explain))
        .route("/api/model/status", get(handlers::model::status))
        .route("/api/model/reload", post(handlers::model::reload));

    let alert_routes = Router::new()
        .route("/api/alerts", get(handlers::alerts::list).post(handlers::alerts::create))
        .route("/api/alerts/metrics/summary", get(handlers::alerts::metrics_summary))
        .route("/api/alerts/:id", get(handlers::alerts::get))
        .route("/api/alerts/:id/guidance", get(handlers::guidance::for_alert))
        .route("/api/guidance/templates", get(handlers::guidance::templates))
        .route("/api/triage", post(handlers::triage::run));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(inference_routes)
        .merge(alert_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
