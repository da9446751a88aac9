use crate::{database::Database, redis_client::RedisClient};
use tracing::info;

pub mod events;

/// Кеш карточек мероприятий в Redis поверх БД.
///
/// Промах или сбой Redis ведёт в БД; бронь и отмена сбрасывают ключи мероприятия.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    event_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, event_ttl_secs: u64) -> Self {
        Self { redis, db, event_ttl_secs }
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");
        match self.get_events().await {
            Ok(events) => info!("Cache warmup done: {} events", events.len()),
            Err(e) => tracing::warn!("Cache warmup skipped: {:?}", e),
        }
    }
}
