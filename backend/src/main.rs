use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod automations;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod validation;

pub use error::{ApiError, ApiResult, AppError};

#[cfg(test)]
mod tests;

use automations::{AutomationEngine, HttpWebhookClient, PgAutomationStore};

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub automations: Arc<AutomationEngine>,
}

impl AppState {
    /// Wires the automation engine to Postgres and the reqwest webhook client.
    pub fn new(db_pool: sqlx::PgPool, settings: &config::AutomationConfig) -> anyhow::Result<Self> {
        let store = Arc::new(PgAutomationStore::new(db_pool.clone()));
        let webhooks = Arc::new(HttpWebhookClient::new(
            &settings.webhook_user_agent,
            settings.webhook_timeout,
        )?);

        let engine = AutomationEngine::new(store.clone(), store, webhooks).with_enabled(settings.enabled);

        Ok(Self {
            db_pool,
            automations: Arc::new(engine),
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { concat!("RecordFlow API v", env!("CARGO_PKG_VERSION")) }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", handlers::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let db_pool = database::create_pool(&config.database_url).await?;

    database::migrate(&db_pool).await?;

    if !config.automations.enabled {
        tracing::warn!("Automations are disabled; record events will not run rules");
    }

    let app_state = Arc::new(AppState::new(db_pool, &config.automations)?);
    let app = app(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
