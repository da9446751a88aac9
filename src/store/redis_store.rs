use async_trait::async_trait;
use redis::AsyncCommands;

use super::KeyValueStore;
use crate::error::StoreError;
use crate::redis_client::RedisClient;

/// Хранилище в Redis: ключи получают общий префикс, TTL не ставится.
#[derive(Clone)]
pub struct RedisStore {
    redis: RedisClient,
    prefix: String,
}

impl RedisStore {
    pub fn new(redis: RedisClient, prefix: impl Into<String>) -> Self {
        Self { redis, prefix: prefix.into() }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.redis.conn.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.redis.conn.clone();
        let _: () = conn.set(self.key(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.redis.conn.clone();
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }
}
