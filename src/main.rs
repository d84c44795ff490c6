//! Shelfmark Server - library relationship web application

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;

use shelfmark::{
    api,
    config::AppConfig,
    logging,
    repository::Repository,
    services::{
        redis::RedisService,
        sessions::{MemoryRevocationStore, RevocationStore},
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let _log_guard = logging::init(&config.logging);

    tracing::info!("Starting Shelfmark v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let revocations: Arc<dyn RevocationStore> = if config.redis.url.is_empty() {
        tracing::warn!("No Redis URL configured, logged-out sessions are kept in memory");
        Arc::new(MemoryRevocationStore::new())
    } else {
        let redis = RedisService::new(&config.redis.url).await?;
        tracing::info!("Connected to Redis");
        Arc::new(redis)
    };

    let repository = Repository::new(pool);
    let services = Services::new(repository, config.auth.clone(), revocations)?;

    if let Some(admin) = &config.auth.bootstrap_admin {
        services.users.ensure_bootstrap_admin(admin).await?;
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
