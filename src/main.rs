//! Custom LLM Gateway - Main entry point
//!
//! This binary creates and runs the HTTP server with all configured routes
//! and middleware. Configuration is loaded from environment variables.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::Local;
use convoai_llm_gateway::{
    api::{
        audio_chat_completions, chat_completions, metrics_handler, ping, rag_chat_completions,
        ApiDoc, AppState,
    },
    core::{init_metrics, request_id_middleware, AppConfig, MetricsMiddleware},
    services::{CompletionClient, FileAssetSource, KnowledgeBaseStub},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok());

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(async_main())
}

/// Custom time formatter that uses local timezone (respects TZ environment variable)
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

async fn async_main() -> Result<()> {
    // Check if NO_COLOR environment variable is set (for file logging without ANSI codes)
    let no_color = std::env::var("NO_COLOR").is_ok();

    // Always append noise-suppression filters for hyper/h2/reqwest: if
    // RUST_LOG is set to just "info" or "trace" it would otherwise allow
    // very noisy chunked-transfer logs through.
    let base_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,convoai_llm_gateway=debug".to_string());
    let filter_str = format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base_filter
    );
    let filter = tracing_subscriber::EnvFilter::new(filter_str);

    if no_color {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_timer(LocalTime)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_timer(LocalTime))
            .init();
    }

    // Initialize metrics
    init_metrics();

    let config = AppConfig::from_env();
    let http_client = create_http_client(&config);

    let completion = CompletionClient::new(
        http_client,
        config.llm_api_base.clone(),
        config.llm_api_key.clone(),
        config.llm_default_model.clone(),
    );
    let retriever = Arc::new(KnowledgeBaseStub);
    let assets = Arc::new(FileAssetSource::new(
        config.audio.transcript_file.clone(),
        config.audio.pcm_file.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, completion, retriever, assets));

    let app = build_router(state);

    tracing::info!("Starting Custom LLM Gateway on {}", addr);
    tracing::info!(
        "Chat API: /chat/completions, /rag/chat/completions, /audio/chat/completions"
    );
    tracing::info!("Swagger UI: /swagger-ui");
    tracing::info!("Metrics endpoint: /metrics");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build router with all endpoints
fn build_router(state: Arc<AppState>) -> Router {
    // Swagger UI for API documentation
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    let api_routes = Router::new()
        .route("/chat/completions", post(chat_completions))
        .route("/rag/chat/completions", post(rag_chat_completions))
        .route("/audio/chat/completions", post(audio_chat_completions))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .with_state(state);

    Router::new()
        .merge(swagger_ui)
        .merge(api_routes)
        .route("/ping", get(ping))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create HTTP client with connection pooling
fn create_http_client(config: &AppConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(!config.verify_ssl)
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .tcp_keepalive(std::time::Duration::from_secs(60))
        .build()
        .expect("Failed to build HTTP client")
}
