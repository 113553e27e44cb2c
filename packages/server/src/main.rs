use std::sync::Arc;

use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database::init_db;
use server::documents::sweep::run_sweeper;
use server::documents::{DocumentCoordinator, IngressValidator, SeaOrmIndex};
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    // Blob store first: it creates the data directory the default SQLite
    // database lives in.
    let blobs =
        FilesystemBlobStore::new(config.storage.blob_dir.clone(), config.upload.max_size).await?;
    info!(path = %config.storage.blob_dir.display(), "Blob store ready");

    let db = init_db(&config.database).await?;
    info!("Metadata index ready");

    let validator = IngressValidator::from_config(&config.upload);
    let documents = DocumentCoordinator::new(
        Arc::new(blobs),
        Arc::new(SeaOrmIndex::new(db.clone())),
        Arc::new(validator),
    );

    tokio::spawn(run_sweeper(documents.clone(), config.sweep.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        documents,
        config,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    db.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
