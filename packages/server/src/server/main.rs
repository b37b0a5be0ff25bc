// Main entry point for the exception collector server

use std::sync::Arc;

use anyhow::{Context, Result};
use exception_core::kernel::{
    MemoryStore, MutationRateLimiter, PgStore, ServerDeps, SubscriptionHub,
};
use exception_core::server::{auth::JwtService, build_app};
use exception_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,exception_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Interface Exception Collector");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let hub = SubscriptionHub::with_capacity(config.subscriber_buffer);
    let rate_limiter =
        MutationRateLimiter::new(config.rate_limit_per_minute, config.rate_limit_per_hour);
    let settings = config.pipeline_settings();

    let deps = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            let store = Arc::new(PgStore::new(pool));
            ServerDeps::new(store.clone(), store, hub, rate_limiter, settings)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            let store = MemoryStore::new();
            ServerDeps::new(
                Arc::new(store.clone()),
                Arc::new(store),
                hub,
                rate_limiter,
                settings,
            )
        }
    };

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let app = build_app(deps, jwt_service, config.allowed_origins.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("GraphQL explorer: http://localhost:{}/graphql", config.port);
    tracing::info!("Event stream: http://localhost:{}/api/streams/exceptions", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
