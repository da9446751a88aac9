pub mod config;
pub mod database;
pub mod redis_client;
pub mod error;
pub mod models;
pub mod seating;
pub mod store;
pub mod client;
pub mod reservation;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;

use anyhow::Context;
use std::sync::Arc;
use tokio::task;

// Shared state для REST-сервиса
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        tracing::info!("Database connected");

        db.run_migrations().await.context("failed to run migrations")?;

        let redis = redis_client::RedisClient::connect(&config.redis.url)
            .await
            .context("failed to connect to Redis")?;
        tracing::info!("Redis connected");

        let cache = cache::CacheService::new(redis.clone(), db.clone(), config.redis.event_ttl_secs);
        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
