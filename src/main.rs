//! Riverboat - certainty-weighted payouts for prediction circles
//! Players state how sure they are of each outcome; the unsure pay the sure.

use anyhow::{Context, Result};
use riverboat::{api, config::Config, store::Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();
    init_tracing();

    info!("🚀 Riverboat starting");

    let db_path = config.resolved_database_path();
    let store = Arc::new(Store::open(&db_path)?);
    store.status().context("database not usable")?;

    let app = api::router(store);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    info!("🎯 API server listening on {}", config.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riverboat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
