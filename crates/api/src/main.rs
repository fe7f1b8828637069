use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use scenegate_db::{AutoApprovalCounter, LayoutStore, MemoryStore, PgStore, SubmissionStore, ThresholdStore};
use scenegate_pipeline::comparison::ComparisonService;
use scenegate_pipeline::embedding::{DisabledProvider, EmbeddingProvider};
use scenegate_pipeline::http_provider::HttpEmbeddingProvider;
use scenegate_pipeline::orchestrator::DecisionOrchestrator;
use scenegate_pipeline::resilient::ResilientEmbedder;
use scenegate_pipeline::thresholds::ThresholdService;
use scenegate_pipeline::PipelineConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenegate_api::config::ServerConfig;
use scenegate_api::router::build_app_router;
use scenegate_api::state::AppState;

/// Every store trait, backed by one object.
struct Stores {
    submissions: Arc<dyn SubmissionStore>,
    thresholds: Arc<dyn ThresholdStore>,
    counter: Arc<dyn AutoApprovalCounter>,
    layouts: Arc<dyn LayoutStore>,
}

impl Stores {
    fn shared<S>(store: Arc<S>) -> Self
    where
        S: SubmissionStore + ThresholdStore + AutoApprovalCounter + LayoutStore + 'static,
    {
        Self {
            submissions: store.clone(),
            thresholds: store.clone(),
            counter: store.clone(),
            layouts: store,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "scenegate_api=debug,scenegate_pipeline=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
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

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let pipeline_config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Stores ---
    let stores = match &config.database_url {
        Some(url) => {
            let pool = scenegate_db::create_pool(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            scenegate_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            scenegate_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Stores::shared(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Stores::shared(Arc::new(MemoryStore::new()))
        }
    };

    // --- Embedding provider ---
    let provider: Arc<dyn EmbeddingProvider> = match &pipeline_config.embedding_api_key {
        Some(key) => {
            let provider = HttpEmbeddingProvider::new(&pipeline_config, key.clone())
                .context("Failed to build embedding client")?;
            tracing::info!(
                model = %pipeline_config.embedding_model,
                dimension = pipeline_config.embedding_dimension,
                "Embedding provider configured"
            );
            Arc::new(provider)
        }
        None => {
            tracing::warn!("EMBEDDING_API_KEY not set, all comparisons use fallback vectors");
            Arc::new(DisabledProvider)
        }
    };

    // --- Pipeline ---
    let embedder = ResilientEmbedder::new(provider, &pipeline_config);
    let comparison = ComparisonService::new(
        embedder,
        Arc::clone(&stores.layouts),
        pipeline_config.fallback_score,
    );
    let thresholds = ThresholdService::new(Arc::clone(&stores.thresholds), Arc::clone(&stores.counter));
    let orchestrator = DecisionOrchestrator::new(
        Arc::clone(&stores.submissions),
        Arc::clone(&stores.layouts),
        Arc::clone(&stores.counter),
        thresholds,
        comparison,
    );

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        orchestrator,
        layouts: stores.layouts,
        submissions: stores.submissions,
        config: Arc::new(config.clone()),
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        server_shutdown.cancel();
    });

    tokio::select! {
        result = server.into_future() => result.context("Server error")?,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(drain).await;
        } => {
            tracing::warn!(timeout_secs = drain.as_secs(), "Shutdown drain timed out");
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
