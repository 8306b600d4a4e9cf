mod app;
mod auth;
mod config;
mod metrics;

use app::{router, AppState};
use config::ServerConfig;
use jobboard_storage::{snapshot, InMemoryStore, Storage};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let store: Arc<dyn Storage> = match &config.data_dir {
        Some(dir) => match snapshot::load_dir(dir) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "seeding failed, starting empty");
                Arc::new(InMemoryStore::new())
            }
        },
        None => Arc::new(InMemoryStore::new()),
    };

    // Collection size gauges
    let sizes_store = store.clone();
    tokio::spawn(async move {
        loop {
            for (collection, n) in sizes_store.collection_sizes() {
                metrics::COLLECTION_RECORDS
                    .with_label_values(&[&collection])
                    .set(n as i64);
            }
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        }
    });

    let http_addr = config.http_addr;
    let tls = config.tls.clone();
    tracing::info!(
        %http_addr,
        pagination = %config.pagination,
        expand_owner = config.expand_owner,
        auth = config.auth.enabled(),
        "starting job board"
    );
    let app = router(AppState::new(store, config)?);

    match tls {
        Some((cert, key)) => {
            let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
            axum_server::bind_rustls(http_addr, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            axum_server::bind(http_addr)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}
