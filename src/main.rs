//! Wordmania Back binary entrypoint wiring REST, WebSocket and snapshot storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordmania_back::{
    config::AppConfig,
    dao::snapshot_store::MemorySnapshotStore,
    routes,
    services::janitor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    start_storage(&app_state).await;
    spawn_restore(&app_state);
    tokio::spawn(janitor::run(
        app_state.registry(),
        app_state.config().janitor_interval,
    ));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

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

    app_state.registry().shutdown().await;
    info!("server stopped");
    Ok(())
}

/// Install the snapshot store: MongoDB under supervision when `MONGO_URI` is set, memory otherwise.
async fn start_storage(state: &SharedState) {
    if spawn_mongo_supervisor(state) {
        return;
    }

    warn!("MONGO_URI not set; room snapshots are kept in memory only");
    state
        .storage()
        .install(Arc::new(MemorySnapshotStore::new()))
        .await;
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: &SharedState) -> bool {
    use wordmania_back::{
        dao::{
            snapshot_store::{
                SnapshotStore,
                mongodb::{MongoConfig, MongoSnapshotStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let Ok(uri) = env::var("MONGO_URI") else {
        return false;
    };
    let db_name = env::var("MONGO_DB").ok();
    info!("using MongoDB snapshot store");
    tokio::spawn(storage_supervisor::run(state.storage(), move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoSnapshotStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn SnapshotStore>)
        }
    }));
    true
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: &SharedState) -> bool {
    false
}

/// Reload persisted rooms as soon as a snapshot store is available.
fn spawn_restore(state: &SharedState) {
    let storage = state.storage();
    let registry = state.registry();
    tokio::spawn(async move {
        let store = storage.wait_ready().await;
        let report = registry.restore_from(store).await;
        info!(
            restored = report.restored,
            expired_rounds = report.expired_rounds,
            skipped = report.skipped,
            "room restore finished"
        );
    });
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
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
