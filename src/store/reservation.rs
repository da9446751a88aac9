use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::StoreError;
use crate::seating::SeatId;

/// Сохранённый черновик выбора мест пользователя на мероприятие.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub user_id: i64,
    pub event_id: i64,
    pub seats: Vec<SeatId>,
    pub updated_at: DateTime<Utc>,
}

/// Места площадки, считающиеся занятыми на этом устройстве.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    pub venue_id: i64,
    #[serde(rename = "occupiedSeats")]
    pub occupied_seats: BTreeSet<SeatId>,
    pub updated_at: DateTime<Utc>,
}

/// Черновики и занятость поверх [`KeyValueStore`].
///
/// Запись занятости сериализована внутри процесса; между процессами и
/// устройствами никакой согласованности нет.
#[derive(Clone)]
pub struct ReservationStore {
    backend: Arc<dyn KeyValueStore>,
    occupancy_writer: Arc<Mutex<()>>,
}

impl ReservationStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            occupancy_writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn draft_key(user_id: i64, event_id: i64) -> String {
        format!("draft:{user_id}:{event_id}")
    }

    pub fn occupancy_key(venue_id: i64) -> String {
        format!("venue:{venue_id}")
    }

    // Битый блоб не должен ломать сценарий: пишем в лог и считаем, что записи нет.
    async fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring unreadable record {}: {}", key, e);
                Ok(None)
            }
        }
    }

    pub async fn load_draft(&self, user_id: i64, event_id: i64) -> Result<Vec<SeatId>, StoreError> {
        let record: Option<DraftRecord> = self.read_record(&Self::draft_key(user_id, event_id)).await?;
        Ok(record
            .filter(|r| r.user_id == user_id && r.event_id == event_id)
            .map(|r| r.seats)
            .unwrap_or_default())
    }

    /// Сохраняет черновик; пустой черновик удаляет запись.
    pub async fn save_draft(&self, user_id: i64, event_id: i64, seats: &[SeatId]) -> Result<(), StoreError> {
        if seats.is_empty() {
            return self.clear_draft(user_id, event_id).await;
        }
        let record = DraftRecord {
            user_id,
            event_id,
            seats: seats.to_vec(),
            updated_at: Utc::now(),
        };
        self.backend
            .set(&Self::draft_key(user_id, event_id), serde_json::to_string(&record)?)
            .await
    }

    pub async fn clear_draft(&self, user_id: i64, event_id: i64) -> Result<(), StoreError> {
        self.backend.remove(&Self::draft_key(user_id, event_id)).await
    }

    pub async fn load_occupancy(&self, venue_id: i64) -> Result<BTreeSet<SeatId>, StoreError> {
        let record: Option<OccupancyRecord> = self.read_record(&Self::occupancy_key(venue_id)).await?;
        Ok(record
            .filter(|r| r.venue_id == venue_id)
            .map(|r| r.occupied_seats)
            .unwrap_or_default())
    }

    /// Добавляет места в запись занятости площадки. Возвращает число новых мест.
    ///
    /// Вызывается только оформлением брони после подтверждения от API.
    pub(crate) async fn commit_occupancy(&self, venue_id: i64, seats: &[SeatId]) -> Result<usize, StoreError> {
        let _writer = self.occupancy_writer.lock().await;

        let mut occupied = self.load_occupancy(venue_id).await?;
        let before = occupied.len();
        occupied.extend(seats.iter().cloned());
        let added = occupied.len() - before;

        if added > 0 {
            let record = OccupancyRecord {
                venue_id,
                occupied_seats: occupied,
                updated_at: Utc::now(),
            };
            self.backend
                .set(&Self::occupancy_key(venue_id), serde_json::to_string(&record)?)
                .await?;
        }
        debug!("Occupancy for venue {} grew by {} seats", venue_id, added);
        Ok(added)
    }
}
