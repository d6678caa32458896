mod api;
mod config;
mod db;
mod error;
mod models;
mod schema;
mod store;
mod telemetry;
mod uploads;

use anyhow::Context;
use config::Config;
use std::env;
use std::sync::Arc;
use store::{IdAllocator, MemoryStore, PgStore, RecipeStore};
use tokio::net::TcpListener;
use tokio::signal;
use uploads::UploadDir;

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub allocator: Arc<dyn IdAllocator>,
    pub recipes: Arc<dyn RecipeStore>,
    pub uploads: Arc<UploadDir>,
}

impl AppState {
    fn with_store<S>(store: Arc<S>, uploads: UploadDir) -> Self
    where
        S: IdAllocator + RecipeStore + 'static,
    {
        Self {
            allocator: store.clone(),
            recipes: store,
            uploads: Arc::new(uploads),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        println!("{}", api::openapi().to_pretty_json()?);
        return Ok(());
    }

    telemetry::init_telemetry();

    let config = Config::load()?;

    let uploads = UploadDir::new(&config.upload_dir);
    uploads.ensure_exists().await.with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.upload_dir.display()
        )
    })?;

    let state = if config.uses_memory_store() {
        tracing::warn!("Using in-memory store, recipes will not survive a restart");
        AppState::with_store(Arc::new(MemoryStore::new()), uploads)
    } else {
        let pool = db::create_pool(&config.database_url)?;
        AppState::with_store(Arc::new(PgStore::new(pool)), uploads)
    };

    let app = api::app(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    let address = listener.local_addr()?;
    tracing::info!("Server listening on {}", address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
