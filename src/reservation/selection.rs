use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::{SelectionError, StoreError};
use crate::models::Event;
use crate::seating::{Layout, SeatId, SeatMap};
use crate::store::ReservationStore;

/// Результат переключения места.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Added,
    Removed,
}

/// Черновик выбора мест пользователя на одно мероприятие.
///
/// Инвариант: занятое место никогда не попадает в черновик. Каждая мутация
/// сначала сохраняется, потом применяется в памяти; черновик без
/// пользователя живёт только в памяти.
pub struct Selection {
    store: ReservationStore,
    user_id: Option<i64>,
    event: Event,
    layout: Layout,
    occupied: BTreeSet<SeatId>,
    draft: Vec<SeatId>,
}

impl Selection {
    /// Открывает выбор, восстанавливая сохранённый черновик.
    ///
    /// Места, ставшие занятыми или отсутствующие в схеме, отбрасываются.
    pub async fn open(
        store: ReservationStore,
        user_id: Option<i64>,
        event: Event,
        layout: Layout,
    ) -> Result<Self, StoreError> {
        let occupied = store.load_occupancy(event.venue_id).await?;
        let mut selection = Self {
            store,
            user_id,
            event,
            layout,
            occupied,
            draft: Vec::new(),
        };

        if let Some(user_id) = user_id {
            let stored = selection.store.load_draft(user_id, selection.event.id).await?;
            let restored = selection.usable(&stored);
            if restored.len() != stored.len() {
                debug!(
                    "Dropped {} stale seats from draft of user {} for event {}",
                    stored.len() - restored.len(),
                    user_id,
                    selection.event.id
                );
                selection.persist(&restored).await?;
            }
            selection.draft = restored;
        }
        Ok(selection)
    }

    // Места черновика, которые всё ещё можно выбрать.
    fn usable(&self, seats: &[SeatId]) -> Vec<SeatId> {
        let mut seen = BTreeSet::new();
        seats
            .iter()
            .filter(|seat| self.is_addressable(seat) && !self.occupied.contains(*seat))
            .filter(|seat| seen.insert((*seat).clone()))
            .cloned()
            .collect()
    }

    async fn persist(&self, seats: &[SeatId]) -> Result<(), StoreError> {
        match self.user_id {
            Some(user_id) => self.store.save_draft(user_id, self.event.id, seats).await,
            None => Ok(()),
        }
    }

    fn is_addressable(&self, seat: &SeatId) -> bool {
        self.layout.contains(seat, self.event.total_seats)
    }

    /// Переключает место: свободное добавляется, выбранное снимается.
    pub async fn select(&mut self, seat: &SeatId) -> Result<SelectOutcome, SelectionError> {
        if !self.is_addressable(seat) {
            return Err(SelectionError::UnknownSeat(seat.clone()));
        }
        if self.occupied.contains(seat) {
            warn!("Seat {} is already taken at venue {}", seat, self.event.venue_id);
            return Err(SelectionError::SeatTaken(seat.clone()));
        }

        let mut next = self.draft.clone();
        let outcome = match next.iter().position(|s| s == seat) {
            Some(index) => {
                next.remove(index);
                SelectOutcome::Removed
            }
            None => {
                next.push(seat.clone());
                SelectOutcome::Added
            }
        };

        self.persist(&next).await?;
        self.draft = next;
        Ok(outcome)
    }

    /// Снимает место из черновика. Возвращает `false`, если его там не было.
    pub async fn remove(&mut self, seat: &SeatId) -> Result<bool, SelectionError> {
        let Some(index) = self.draft.iter().position(|s| s == seat) else {
            return Ok(false);
        };
        let mut next = self.draft.clone();
        next.remove(index);

        self.persist(&next).await?;
        self.draft = next;
        Ok(true)
    }

    /// Очищает черновик вместе с сохранённой записью.
    pub async fn clear(&mut self) -> Result<(), SelectionError> {
        if let Some(user_id) = self.user_id {
            self.store.clear_draft(user_id, self.event.id).await?;
        }
        self.draft.clear();
        Ok(())
    }

    /// Перечитывает занятость площадки и убирает из черновика занятые места.
    ///
    /// Занятость только растёт: известные места не забываются.
    pub async fn refresh_occupancy(&mut self) -> Result<(), StoreError> {
        let stored = self.store.load_occupancy(self.event.venue_id).await?;
        self.occupied.extend(stored);
        let kept = self.usable(&self.draft);
        if kept.len() != self.draft.len() {
            self.persist(&kept).await?;
            self.draft = kept;
        }
        Ok(())
    }

    /// Места черновика в порядке выбора.
    pub fn seats(&self) -> &[SeatId] {
        &self.draft
    }

    pub fn len(&self) -> usize {
        self.draft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draft.is_empty()
    }

    pub fn contains(&self, seat: &SeatId) -> bool {
        self.draft.contains(seat)
    }

    pub fn total_price(&self) -> f64 {
        self.event.total_price(self.draft.len())
    }

    pub fn seat_map(&self) -> SeatMap {
        SeatMap::generate(&self.layout, self.event.total_seats, &self.occupied, &self.draft)
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn occupied(&self) -> &BTreeSet<SeatId> {
        &self.occupied
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Привязывает черновик к вошедшему пользователю и сохраняет его.
    pub(crate) async fn bind_user(&mut self, user_id: i64) -> Result<(), StoreError> {
        if self.user_id == Some(user_id) {
            return Ok(());
        }
        self.user_id = Some(user_id);
        self.persist(&self.draft).await
    }

    pub(crate) fn update_event(&mut self, event: Event) {
        self.event = event;
    }

    /// После подтверждённой брони: места становятся занятыми, черновик пуст.
    ///
    /// Память обновляется до записи в хранилище.
    pub(crate) async fn absorb_booking(&mut self, seats: &[SeatId]) -> Result<(), StoreError> {
        self.occupied.extend(seats.iter().cloned());
        self.draft.clear();
        match self.user_id {
            Some(user_id) => self.store.clear_draft(user_id, self.event.id).await,
            None => Ok(()),
        }
    }
}
