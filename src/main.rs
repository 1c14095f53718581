// cloudnotes server - profile mirror and shared-note endpoints

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudnotes::config::AppConfig;
use cloudnotes::database::{create_pool, UserRepository};
use cloudnotes::server::{router, AppState};
use cloudnotes::services::SharesService;
use cloudnotes::store::{DocumentStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudnotes=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cloudnotes server");

    let config = AppConfig::from_env();

    let pool = create_pool(&config.database_path).await?;
    let users = UserRepository::new(pool);

    // The document store is an external capability; the in-memory
    // implementation backs local development.
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let shares = Arc::new(SharesService::new(store, &config.public_origin));

    let app = router(AppState { users, shares });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
