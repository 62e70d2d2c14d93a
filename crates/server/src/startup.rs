use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::{AppConfig, StorageBackend};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, AppState};
use service::{
    hospitals::HospitalService,
    storage::{CollectionStorage, JsonFileStorage, MemoryStorage},
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured backend and wrap it in the CRUD service.
pub async fn build_state(cfg: &AppConfig) -> Result<AppState, StartupError> {
    let storage: Arc<dyn CollectionStorage> = match cfg.storage.backend {
        StorageBackend::File => {
            let file = JsonFileStorage::new(&cfg.storage.path).await?;
            info!(path = %file.path().display(), id_strategy = ?cfg.storage.id_strategy, "file storage ready");
            file
        }
        StorageBackend::Memory => {
            info!(id_strategy = ?cfg.storage.id_strategy, "memory storage ready");
            MemoryStorage::new()
        }
    };
    let hospitals = Arc::new(HospitalService::new(storage, cfg.storage.id_strategy));
    Ok(AppState { hospitals })
}

pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let state = build_state(cfg).await?;
    Ok(routes::build_router(
        state,
        &cfg.server.resource_path,
        cfg.server.max_body_bytes,
        build_cors(),
    ))
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))
}

/// Serve `cfg` on an already-bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    cfg: &AppConfig,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(cfg).await?;
    let addr = listener.local_addr().map_err(anyhow::Error::from)?;
    info!(%addr, resource = %cfg.server.resource_path, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received Ctrl+C, draining connections");
    }
}

/// Public entry: load configuration, build the app and run the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load_and_validate()?;
    let addr = bind_addr(&cfg)?;
    let listener = TcpListener::bind(addr).await?;
    serve_with_shutdown(&cfg, listener, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}
