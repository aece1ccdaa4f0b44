//! Lendrate API Gateway
//!
//! The entry point for the loan portal's rate endpoints.
//! Handles:
//! - Authentication and authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod extract;
mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    BoxError, Router,
};
use lendrate_common::{
    auth::JwtManager,
    config::{AppConfig, ObservabilityConfig},
    db,
    errors::AppError,
    metrics::{self, LATENCY_BUCKETS},
    RateService, RateStore,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::{
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub rates: RateService,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn RateStore>) -> anyhow::Result<Self> {
        let secret = config
            .auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("auth.jwt_secret must be set (APP__AUTH__JWT_SECRET)")?;

        let jwt = Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs));
        let rates = RateService::new(store).with_legacy_fallback(config.rates.legacy_fallback);

        Ok(Self { config, rates, jwt })
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Lendrate API Gateway v{}",
        lendrate_common::VERSION
    );

    // Initialize metrics
    install_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    // Initialize storage
    let store = db::open_store(&config.database).await?;
    info!(backend = store.backend(), "Rate store ready");

    let state = AppState::new(config.clone(), store)?;

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Serve Prometheus metrics on their own port; 0 disables the exporter
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Admin rate tables. `/rates/{category}` also addresses single-rate rows
    // by id: GET tells the two apart by the segment, PATCH/DELETE only take ids.
    let admin_routes = Router::new()
        .route(
            "/rates",
            get(handlers::legacy_rates::list_rates).post(handlers::legacy_rates::create_rate),
        )
        .route(
            "/rates/{category}",
            get(handlers::get_rate_table)
                .post(handlers::term_rates::create_range)
                .patch(handlers::legacy_rates::update_rate)
                .delete(handlers::legacy_rates::delete_rate),
        )
        .route(
            "/rates/{category}/{key}",
            get(handlers::term_rates::get_range)
                .patch(handlers::term_rates::update_range)
                .delete(handlers::term_rates::delete_range),
        );

    // Dealer lookups
    let dealer_routes = Router::new()
        .route("/rates/resolve", get(handlers::quotes::resolve_rate))
        .route("/calculator/quote", post(handlers::quotes::quote_loan));

    let mut api_routes = Router::new()
        .nest("/admin", admin_routes)
        .merge(dealer_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics));

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        api_routes = api_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(state.config.request_timeout())),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Report a request that outlived `server.request_timeout_secs` in the error envelope
async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal {
            message: format!("Unhandled middleware error: {}", err),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
