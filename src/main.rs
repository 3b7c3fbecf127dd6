use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use invoice_intake::config::Config;
use invoice_intake::db::Database;
use invoice_intake::db_storage::PgInvoiceRepository;
use invoice_intake::extraction_client::GeminiExtractor;
use invoice_intake::handlers::{self, AppState};
use invoice_intake::ingestion::IngestionPipeline;
use invoice_intake::services::HttpImageFetcher;
use invoice_intake::storage_client::SupabaseStorage;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool and the external
/// clients, then serves the HTTP API until Ctrl-C or SIGTERM. The pool is
/// closed explicitly once the server has drained.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invoice_intake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Open database connection pool (runs migrations)
    let db = Database::open(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let repository = Arc::new(PgInvoiceRepository::new(db.pool.clone()));

    let extractor = Arc::new(GeminiExtractor::new(
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
        config.google_api_key.clone(),
    )?);
    tracing::info!("✓ Gemini extractor initialized: {}", config.gemini_model);

    let storage = Arc::new(SupabaseStorage::new(
        config.supabase_url.clone(),
        config.supabase_key.clone(),
        config.storage_bucket.clone(),
    )?);
    tracing::info!("✓ Supabase storage initialized: bucket '{}'", config.storage_bucket);

    let pipeline = IngestionPipeline::new(
        Arc::new(HttpImageFetcher::new()?),
        extractor,
        repository.clone(),
    );

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        repository,
        storage,
        pipeline,
    });

    // Configure rate limiter: 5 requests/second per IP, burst of 10
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_routes().layer(ServiceBuilder::new().layer(GovernorLayer {
        config: governor_conf,
    }));

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    tracing::info!("Database pool closed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
