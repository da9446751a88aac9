use crate::cache::CacheService;
use crate::models::{Event, EventFilter, EventMedia, EventRow, UnknownVariant};
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

const EVENTS_KEY: &str = "events:all";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Corrupt(#[from] UnknownVariant),
}

fn event_key(id: i64) -> String {
    format!("events:{id}")
}

impl CacheService {
    // Мероприятие с медиа: сначала кеш, потом БД
    pub async fn get_event(&self, id: i64) -> Result<Option<Event>, CacheError> {
        if let Some(event) = self.read_cached::<Event>(&event_key(id)).await {
            return Ok(Some(event));
        }

        let Some(row) = EventRow::find_by_id(id, &self.db).await? else {
            return Ok(None);
        };
        let media = EventMedia::for_event(id, &self.db).await?;
        let event = row.into_event(media)?;

        self.write_cached(&event_key(id), &event).await;
        Ok(Some(event))
    }

    // Полный список кешируется, отфильтрованный - нет
    pub async fn get_events(&self) -> Result<Vec<Event>, CacheError> {
        if let Some(events) = self.read_cached::<Vec<Event>>(EVENTS_KEY).await {
            return Ok(events);
        }
        let events = self.load_events(&EventFilter::default()).await?;
        self.write_cached(EVENTS_KEY, &events).await;
        Ok(events)
    }

    pub async fn search_events(&self, filter: &EventFilter) -> Result<Vec<Event>, CacheError> {
        if filter.is_empty() {
            return self.get_events().await;
        }
        self.load_events(filter).await
    }

    async fn load_events(&self, filter: &EventFilter) -> Result<Vec<Event>, CacheError> {
        EventRow::list(filter, &self.db)
            .await?
            .into_iter()
            .map(|row| row.into_event(Vec::new()).map_err(CacheError::from))
            .collect()
    }

    /// Сбросить кеш мероприятия после изменения его броней.
    pub async fn invalidate_event(&self, id: i64) {
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.del(&[event_key(id), EVENTS_KEY.to_string()]).await;
        match result {
            Ok(()) => debug!("Event {} cache invalidated", id),
            Err(e) => warn!("Failed to invalidate event {} cache: {}", id, e),
        }
    }

    // === Работа с кешем ===
    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = match conn.get(key).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Redis read {} failed: {}", key, e);
                return None;
            }
        };
        data.and_then(|raw| serde_json::from_str(&raw).ok())
    }

    async fn write_cached<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(data) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.set_ex(key, data, self.event_ttl_secs).await;
        if let Err(e) = result {
            warn!("Redis write {} failed: {}", key, e);
        }
    }
}
