use redis::{aio::MultiplexedConnection, Client, RedisResult};

/// Общее мультиплексированное соединение: кеш мероприятий и клиентское хранилище.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(redis_url: &str) -> RedisResult<Self> {
        let conn = Client::open(redis_url)?
            .get_multiplexed_tokio_connection()
            .await?;
        Ok(RedisClient { conn })
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await.map(|_| ())
    }
}
