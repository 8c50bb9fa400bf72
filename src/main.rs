mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod error;

use std::net::SocketAddr;

use axum::{Router, routing::get, response::Html};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::config::Config;
use crate::routes::dashboard_routes::api_routes;
use crate::services::dashboard_service;
use crate::services::store::DataStore;
use crate::shared_state::AppState;

const CONFIG_ENV: &str = "SOLAR_DASHBOARD_CONFIG";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Load configuration
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return;
        }
    };
    info!(
        path = %config_path,
        provider = ?config.weather.provider,
        latitude = config.weather.latitude,
        longitude = config.weather.longitude,
        "configuration loaded"
    );

    // 2. Open the database and build shared state
    let store = match DataStore::open(&config.database.path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %config.database.path, "failed to open database");
            return;
        }
    };
    let state = match AppState::new(config.clone(), store) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to build weather client");
            return;
        }
    };

    // 3. Keep the weather cache warm
    let warm_state = state.clone();
    tokio::spawn(async move {
        let period = warm_state
            .weather_ttl()
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(7200));
        loop {
            match dashboard_service::get_weather(&warm_state, false, Utc::now()).await {
                Ok(w) if w.is_stale => warn!(last_updated = %w.last_updated, "weather cache holds a stale forecast"),
                Ok(w) => info!(days = w.forecast.len(), last_updated = %w.last_updated, "weather cache warm"),
                Err(e) => warn!(error = %e, "weather warm-up failed"),
            }
            tokio::time::sleep(period).await;
        }
    });

    // 4. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("API server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    if let Err(e) = axum_server::bind(addr).serve(app.into_make_service()).await {
        error!(error = %e, "HTTP server stopped");
    }
}
