//! payx-api entry point.
//!
//! Thin by intent: tracing, settings, pool + cache wiring, middleware, and
//! the HTTP server. Route handlers live in `routes.rs`; state in
//! `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use payx_api::{routes, state::AppState};
use payx_cache::{Cache, RedisCache, UnreachableCache};
use payx_config::ApiSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let settings = ApiSettings::from_env().context("invalid api settings")?;
    info!(service = %settings.service_name, "starting");

    let pool = payx_db::connect(&settings.database_url).await?;

    // The cache is an availability optimization; a dead Redis at boot must
    // not keep the API down. Every gate fails open or falls back to the DB.
    let cache: Arc<dyn Cache> = match RedisCache::connect(&settings.redis_url).await {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            warn!(error = %err, "redis unavailable at startup; continuing without cache");
            Arc::new(UnreachableCache)
        }
    };

    let shared = Arc::new(AppState::from_settings(&settings, pool, cache));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_settings(&settings));

    let addr: std::net::SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind addr {}", settings.bind_addr))?;
    info!("payx-api listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn cors_from_settings(settings: &ApiSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
