mod routes;

use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode},
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use yn_dashboard_core::{Dashboard, DashboardConfig, DashboardContext};
use yn_wallet::WalletConnector;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

pub(crate) type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dashboard: Arc<Dashboard>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = DashboardConfig::from_env();
    info!(
        "gov endpoint {}, lcd endpoint {}, chain {}",
        config.gov_endpoint, config.lcd_endpoint, config.chain_id
    );

    // The service has no browser wallet; governance reads are unsigned.
    let ctx = DashboardContext::from_config(config, WalletConnector::unavailable())?;
    let state = AppState {
        dashboard: Arc::new(Dashboard::new(ctx)),
    };

    let origins = std::env::var("YN_CORS_ORIGINS").unwrap_or_else(|_| "*".to_owned());
    let app = app(state).layer(cors_layer(&origins));

    let addr: SocketAddr = std::env::var("YN_LISTEN_ADDR")
        .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned())
        .parse()?;
    info!("dashboard-service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/functions", get(routes::functions))
        .route("/gov/proposals", get(routes::gov_proposals))
        .route("/prices/shd", get(routes::shd_price))
        .route("/prices/oracle/{key}", get(routes::oracle_price))
        .route("/prices/batch", get(routes::batch_prices))
        .route("/prices/batch/atomic", get(routes::atomic_prices))
        .route("/prices/derivatives", get(routes::derivative_prices))
        .route("/prices/silk", get(routes::silk_price))
        .route("/prices/stkd-exchange-rate", get(routes::stkd_exchange_rate))
        .route("/prices/dshd", get(routes::dshd_price))
        .route("/prices/tokens", get(routes::token_prices))
        .route("/shadeswap/pools", get(routes::shadeswap_pools))
        .route("/stride/redemption-rates", get(routes::redemption_rates))
        .route("/stride/redemption-rates/tia", get(routes::redemption_rate_tia))
        .route("/stride/redemption-rates/all", get(routes::all_redemption_rates))
        .with_state(state)
}

/// `*` allows any origin; otherwise a comma-separated origin list.
fn cors_layer(origins: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.split(',').any(|origin| origin.trim() == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    if parsed.is_empty() {
        warn!("no valid CORS origins in {:?}; cross-origin requests will be refused", origins);
        return base;
    }
    base.allow_origin(parsed)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "dashboard-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "dashboard-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

/// Upstream node or price service failed.
pub(crate) fn bad_gateway(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
