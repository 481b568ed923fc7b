use std::net::SocketAddr;

use anyhow::Result;
use tracing::info;

use cba_gateway::{
    AppState, Config, build_router,
    config::StorageConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cba_gateway=info,tower_http=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    match &config.storage {
        StorageConfig::Filesystem { dir } => info!(dir = %dir.display(), "using filesystem object store"),
        StorageConfig::Memory => info!("using in-memory object store"),
    }
    if config.notify.token.is_none() {
        tracing::warn!("TOKEN is not set, /line/sendMessage will fail");
    }

    let bind_address = config.bind_address();
    let state = AppState::from_config(&config)?;
    let router = build_router(state);
    let tcp_listener = tokio::net::TcpListener::bind(bind_address).await?;

    info!("CBA gateway listening on http://{}", bind_address);

    axum::serve(
        tcp_listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}
