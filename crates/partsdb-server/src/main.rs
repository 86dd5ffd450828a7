mod api;
mod middleware;

use std::sync::Arc;

use partsdb_ingest::{CatalogService, CatalogSettings, LocalBlobStore, PgCatalogStore};
use partsdb_jobs::JobLauncher;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(partsdb_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = partsdb_db::PoolConfig::from_app_config(&config);
    let pool = partsdb_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = partsdb_db::run_migrations(&pool).await?;
    tracing::info!(applied, env = %config.env, "database ready");

    let catalog = CatalogService::new(
        Arc::new(PgCatalogStore::new(pool.clone())),
        LocalBlobStore::new(&config.storage_root),
        CatalogSettings::from_app_config(&config),
    );
    let state = AppState {
        status: partsdb_db::StatusStore::new(pool.clone()),
        jobs: JobLauncher::new(pool.clone(), config.jobs.clone()),
        pool,
        catalog,
        config: Arc::clone(&config),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
