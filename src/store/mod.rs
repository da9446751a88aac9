//! Долговременное локальное хранилище клиента.
//!
//! Всё клиентское состояние (черновики выбора, занятость площадок, сессия)
//! лежит в виде JSON-блобов в [`KeyValueStore`]. Типизированный доступ дают
//! [`ReservationStore`] и [`SessionStore`].
//!
//! Политика инвалидации:
//! - черновик `(user, event)` удаляется после успешной брони или явного сброса;
//! - запись занятости площадки только растёт и пишется только оформлением брони;
//! - сессия удаляется при выходе и при ответе 401.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StoreError;
use crate::redis_client::RedisClient;

pub mod file;
pub mod memory;
pub mod redis_store;
pub mod reservation;
pub mod session;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use reservation::{DraftRecord, OccupancyRecord, ReservationStore};
pub use session::{Session, SessionStore};

/// Строковое хранилище ключ-значение.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Открывает бэкенд, выбранный в конфигурации.
pub async fn open(config: &StorageConfig, redis_url: &str) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.path).await?),
        StorageBackend::Redis => {
            let client = RedisClient::connect(redis_url).await?;
            Arc::new(RedisStore::new(client, "quicket"))
        }
    };
    tracing::info!("Client storage opened: {:?}", config.backend);
    Ok(store)
}
