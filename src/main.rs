//! Kyuyo Engine — process entry point.
//!
//! HTTP routing, authentication, and request parsing are collaborators
//! outside this crate's core (see the design document's non-goals); this
//! binary only wires up the ambient stack — configuration and structured
//! logging — the way the donor platform's `main.rs` does, plus a bare
//! health check an operator's load balancer can poll.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use kyuyo_engine::{Config, Repository};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    #[allow(dead_code)]
    repo: Arc<Repository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.rust_log)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState {
        repo: Arc::new(Repository::new()),
    };

    let app = Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "kyuyo-engine"})) }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("kyuyo-engine listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
