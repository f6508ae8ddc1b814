#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use lesson_engine::http_api::{self, AppState, SharedMetricStore, SharedSideChannel};
    use lesson_engine::{
        EngineConfig, JsonFileSideChannel, MemoryMetricStore, MemorySideChannel, logging,
    };

    let config = EngineConfig::from_env()?;
    logging::init_tracing(&config.log_level);

    let addr: SocketAddr = config.http_addr.parse()?;

    let metric_store: SharedMetricStore = match &config.database_path {
        #[cfg(feature = "sqlite")]
        Some(path) => Arc::new(lesson_engine::SqliteMetricStore::new(path)?),
        #[cfg(not(feature = "sqlite"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "built without sqlite, using in-memory metric rows"
            );
            Arc::new(MemoryMetricStore::new())
        }
        None => Arc::new(MemoryMetricStore::new()),
    };
    let side_channel: SharedSideChannel = match &config.side_channel_path {
        Some(path) => Arc::new(JsonFileSideChannel::new(path)),
        None => Arc::new(MemorySideChannel::new()),
    };

    let state = AppState::new(metric_store, side_channel, config.bonus.clone());
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
