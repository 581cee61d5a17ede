//! RagChat API Gateway
//!
//! The single entry point for the question answering service.
//! Handles:
//! - Grounded question answering with conversation memory
//! - Retrieval diagnostics
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod conversation;
mod handlers;
mod middleware;
mod pipeline;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use conversation::ConversationState;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use pipeline::{ConversationPipeline, RerankBounds};
use ragchat_common::{
    config::{AppConfig, ObservabilityConfig},
    embeddings::create_embedder,
    generation::create_generator,
    metrics,
};
use ragchat_retrieval::{create_reranker, FlatIndexRetriever, HybridRetriever, VectorIndex};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub index: Arc<VectorIndex>,
    pub pipeline: Arc<ConversationPipeline>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration; logging is configured from it
    let config = match std::env::var("APP_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?,
        Err(_) => AppConfig::load()?,
    };

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting RagChat API Gateway v{}",
        ragchat_common::VERSION
    );

    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        prometheus_builder()?.with_http_listener(metrics_addr).install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Load the vector index; the service cannot answer without it
    info!(path = %config.index.path.display(), "Loading vector index...");
    let index = VectorIndex::load(&config.index.path).map_err(|e| {
        tracing::error!(error = %e, "Failed to load vector index");
        e
    })?;
    let index = Arc::new(index);
    info!(passages = index.len(), dimension = index.dimension(), "Vector index loaded");

    let state = build_state(config.clone(), index)?;

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Exporter builder with the shared latency buckets, so histograms are
/// exposed as Prometheus histograms rather than summaries
fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets(metrics::LATENCY_BUCKETS)
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Wire collaborators into the answering pipeline
fn build_state(config: Arc<AppConfig>, index: Arc<VectorIndex>) -> ragchat_common::Result<AppState> {
    let embedder = create_embedder(&config.embedding)?;
    let dense = FlatIndexRetriever::new(index.clone(), embedder)?;
    let retriever = HybridRetriever::new(Arc::new(dense), config.retrieval.k);

    let reranker = create_reranker(&config.rerank)?;
    let generator = create_generator(&config.generation)?;

    let pipeline = ConversationPipeline::new(
        retriever,
        reranker,
        generator,
        Arc::new(ConversationState::new()),
        RerankBounds {
            fan_out: config.rerank.fan_out,
            top_n: config.rerank.top_n,
        },
    );

    Ok(AppState {
        config,
        index,
        pipeline: Arc::new(pipeline),
    })
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

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Question answering
        .route("/query", post(handlers::query::query))
        .route("/last-messages", get(handlers::messages::last_messages))

        // Retrieval diagnostics
        .route(
            "/relevant-contexts",
            get(handlers::contexts::get_contexts).post(handlers::contexts::post_contexts),
        )
        .route_layer(from_fn(middleware::metrics::track_metrics))
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
