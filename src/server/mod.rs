pub mod handlers;
pub mod types;

use crate::{
    Error, Result,
    artifacts::{SweepTarget, spawn_sweeper},
    config::{Config, ServerConfig},
    pipeline::Pipeline,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Room for multipart boundaries and the non-file fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub async fn run(config: Config) -> Result<()> {
    // Directories are created here, once, before any request is accepted
    let pipeline = Arc::new(Pipeline::from_config(&config).await?);

    let _sweeper = spawn_sweeper(
        sweep_targets(&config, &pipeline),
        Duration::from_secs(config.storage.sweep_interval_secs.max(1)),
    );

    let app = router(pipeline, &config.server)?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Builds the HTTP surface: the upload endpoint, artifact serving and health.
pub fn router(pipeline: Arc<Pipeline>, server: &ServerConfig) -> Result<Router> {
    let artifacts = ServeDir::new(pipeline.artifacts().dir());
    let static_prefix = pipeline.artifacts().url_prefix().to_string();
    let cors = cors_layer(&server.cors_origin)?;

    let app_state = handlers::AppState {
        pipeline,
        max_upload_bytes: server.max_upload_bytes,
    };

    Ok(Router::new()
        .route("/api/v1/upload", post(handlers::upload))
        .route("/health", get(handlers::health))
        .nest_service(&static_prefix, artifacts)
        .layer(DefaultBodyLimit::max(
            server.max_upload_bytes + MULTIPART_OVERHEAD,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        let value = origin
            .parse::<HeaderValue>()
            .map_err(|e| Error::config(format!("Invalid CORS origin '{}': {}", origin, e)))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any))
}

fn sweep_targets(config: &Config, pipeline: &Pipeline) -> Vec<SweepTarget> {
    let mut targets = Vec::new();
    if let Some(secs) = config.storage.artifact_retention_secs {
        targets.push(SweepTarget {
            dir: pipeline.artifacts().dir().to_path_buf(),
            max_age: Duration::from_secs(secs),
        });
    }
    if let Some(secs) = config.storage.upload_retention_secs {
        targets.push(SweepTarget {
            dir: pipeline.stager().dir().to_path_buf(),
            max_age: Duration::from_secs(secs),
        });
    }
    targets
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
