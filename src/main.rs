//! Courtside Back binary entrypoint wiring REST, WebSocket, SSE and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtside_back::{
    config::AppConfig,
    dao::match_store::MemoryMatchStore,
    routes,
    services::{persistence, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    tokio::spawn(persistence::run(app_state.clone()));
    start_storage(app_state.clone()).await?;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Select the storage backend from `STORAGE_BACKEND` and hand it to the supervisor.
async fn start_storage(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".into());
    info!(backend = %backend, "configuring storage");

    match backend.to_ascii_lowercase().as_str() {
        "memory" => {
            storage_supervisor::attach(&state, Arc::new(MemoryMatchStore::new())).await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            use courtside_back::dao::{
                match_store::{
                    MatchStore,
                    mongodb::{MongoConfig, MongoMatchStore},
                },
                storage::StorageError,
            };

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                let store = MongoMatchStore::connect(config).await.map_err(StorageError::from)?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn MatchStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => {
            use courtside_back::dao::{
                match_store::{
                    MatchStore,
                    couchdb::{CouchConfig, CouchMatchStore},
                },
                storage::StorageError,
            };

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env().map_err(StorageError::from)?;
                let store = CouchMatchStore::connect(config).await.map_err(StorageError::from)?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn MatchStore>)
            }));
        }
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    }

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
