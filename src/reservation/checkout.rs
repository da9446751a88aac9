use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::payment::{PaymentGate, PaymentOutcome, PaymentSession};
use super::selection::{SelectOutcome, Selection};
use crate::client::BookingApi;
use crate::config::{ClientConfig, PaymentConfig};
use crate::error::{ApiError, CheckoutError, SelectionError};
use crate::models::{Booking, Event, NewBooking};
use crate::seating::{Layout, SeatId, SeatMap};
use crate::store::{ReservationStore, SessionStore};

const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);

/// Фаза оформления брони.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    Idle,
    AwaitingPayment,
    Committing,
    Succeeded,
}

impl CheckoutPhase {
    /// Можно ли менять выбор мест в этой фазе.
    pub fn is_editable(self) -> bool {
        matches!(self, CheckoutPhase::Idle | CheckoutPhase::Succeeded)
    }
}

/// Подтверждение успешной брони.
///
/// `storage_warning` заполнен, если бронь создана сервером, но локальная
/// запись занятости или черновика не сохранилась. Повторять оплату нельзя.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirmation {
    pub booking_id: i64,
    pub seats: Vec<SeatId>,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    Booked(Confirmation),
    Cancelled,
}

// Фаза и признак жизни текущей платёжной сессии.
struct PhaseCell {
    phase: CheckoutPhase,
    payment: Weak<()>,
}

impl PhaseCell {
    // Сессия оплаты удалена без итога: оформление возвращается в Idle.
    fn settle(&mut self) {
        if self.phase == CheckoutPhase::AwaitingPayment && self.payment.strong_count() == 0 {
            info!("Payment session dropped without outcome, selection kept");
            self.phase = CheckoutPhase::Idle;
        }
    }
}

// Возвращает фазу в Idle, если завершение оборвалось на полпути (future удалён).
struct CommitGuard<'a> {
    cell: &'a StdMutex<PhaseCell>,
    finished: bool,
}

impl CommitGuard<'_> {
    fn finish(mut self, phase: CheckoutPhase) {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner).phase = phase;
        self.finished = true;
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cell.lock().unwrap_or_else(PoisonError::into_inner).phase = CheckoutPhase::Idle;
        }
    }
}

/// Оформление брони на одно мероприятие: выбор мест, оплата, отправка в API.
pub struct BookingFlow {
    api: Arc<dyn BookingApi>,
    reservations: ReservationStore,
    sessions: SessionStore,
    gate: PaymentGate,
    redirect_delay: Duration,
    selection: Mutex<Selection>,
    cell: StdMutex<PhaseCell>,
}

impl BookingFlow {
    /// Открывает оформление; черновик восстанавливается для текущей сессии.
    pub async fn open(
        api: Arc<dyn BookingApi>,
        reservations: ReservationStore,
        sessions: SessionStore,
        event: Event,
        layout: Layout,
    ) -> Result<Self, CheckoutError> {
        let user_id = sessions.current().await?.map(|s| s.user_id);
        let selection = Selection::open(reservations.clone(), user_id, event, layout).await?;

        Ok(Self {
            api,
            reservations,
            sessions,
            gate: PaymentGate::default(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            selection: Mutex::new(selection),
            cell: StdMutex::new(PhaseCell {
                phase: CheckoutPhase::Idle,
                payment: Weak::new(),
            }),
        })
    }

    pub fn with_payment_gate(mut self, gate: PaymentGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Таймер оплаты и задержка перехода на вход из конфигурации.
    pub fn with_config(self, payment: &PaymentConfig, client: &ClientConfig) -> Self {
        self.with_payment_gate(PaymentGate::from_config(payment))
            .with_redirect_delay(client.redirect_delay())
    }

    pub fn phase(&self) -> CheckoutPhase {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        cell.settle();
        cell.phase
    }

    // Атомарный переход фазы; `false`, если текущая фаза не `from`.
    fn transition(&self, from: &[CheckoutPhase], to: CheckoutPhase) -> bool {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        cell.settle();
        if from.contains(&cell.phase) {
            cell.phase = to;
            true
        } else {
            false
        }
    }

    fn ensure_editable(&self) -> Result<(), SelectionError> {
        if self.phase().is_editable() {
            Ok(())
        } else {
            Err(SelectionError::Locked)
        }
    }

    pub async fn select(&self, seat: &SeatId) -> Result<SelectOutcome, CheckoutError> {
        let mut selection = self.selection.lock().await;
        self.ensure_editable()?;
        Ok(selection.select(seat).await?)
    }

    pub async fn remove(&self, seat: &SeatId) -> Result<bool, CheckoutError> {
        let mut selection = self.selection.lock().await;
        self.ensure_editable()?;
        Ok(selection.remove(seat).await?)
    }

    pub async fn clear(&self) -> Result<(), CheckoutError> {
        let mut selection = self.selection.lock().await;
        self.ensure_editable()?;
        Ok(selection.clear().await?)
    }

    pub async fn selected_seats(&self) -> Vec<SeatId> {
        self.selection.lock().await.seats().to_vec()
    }

    pub async fn total_price(&self) -> f64 {
        self.selection.lock().await.total_price()
    }

    pub async fn seat_map(&self) -> SeatMap {
        self.selection.lock().await.seat_map()
    }

    pub async fn event(&self) -> Event {
        self.selection.lock().await.event().clone()
    }

    /// Проверяет предусловия и запускает оплату.
    ///
    /// Порядок проверок: сессия, непустой выбор, хватает свободных мест.
    /// Ни одна из проверок не обращается к сети.
    pub async fn begin_payment(&self) -> Result<PaymentSession, CheckoutError> {
        let session = self.sessions.require().await?;

        let mut selection = self.selection.lock().await;
        if selection.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }
        let available = selection.event().available_seats;
        if selection.len() > available as usize {
            return Err(CheckoutError::NotEnoughSeats {
                requested: selection.len(),
                available,
            });
        }
        selection.bind_user(session.user_id).await?;

        let payment = {
            let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
            cell.settle();
            if !cell.phase.is_editable() {
                return Err(CheckoutError::PaymentInProgress);
            }
            let payment = self.gate.start();
            cell.phase = CheckoutPhase::AwaitingPayment;
            cell.payment = payment.liveness();
            payment
        };

        info!(
            "User {} started payment for {} seats of event {}",
            session.user_id,
            selection.len(),
            selection.event().id
        );
        Ok(payment)
    }

    /// Отмена оплаты: черновик остаётся, брони и записи занятости нет.
    pub fn abandon_payment(&self, payment: PaymentSession) -> Result<(), CheckoutError> {
        payment.cancel();
        let abandoned = self.transition(&[CheckoutPhase::AwaitingPayment], CheckoutPhase::Idle);
        drop(payment);
        if abandoned {
            info!("Payment abandoned, selection kept");
            Ok(())
        } else {
            Err(CheckoutError::NotAwaitingPayment)
        }
    }

    /// Ждёт итог оплаты и завершает или отменяет оформление.
    ///
    /// Если future удалён до итога, сессия останавливается и фаза
    /// возвращается в Idle без брони.
    pub async fn finish(&self, payment: PaymentSession) -> Result<CheckoutOutcome, CheckoutError> {
        let _alive = payment.keep_alive();
        match payment.outcome().await {
            PaymentOutcome::Succeeded => self.complete_payment().await.map(CheckoutOutcome::Booked),
            PaymentOutcome::Cancelled => {
                if self.transition(&[CheckoutPhase::AwaitingPayment], CheckoutPhase::Idle) {
                    info!("Payment cancelled, selection kept");
                }
                Ok(CheckoutOutcome::Cancelled)
            }
        }
    }

    /// Отправляет бронь после оплаты. Выполняется не более одного раза за оплату
    /// и только пока платёжная сессия жива.
    pub async fn complete_payment(&self) -> Result<Confirmation, CheckoutError> {
        if !self.transition(&[CheckoutPhase::AwaitingPayment], CheckoutPhase::Committing) {
            return Err(CheckoutError::NotAwaitingPayment);
        }
        let guard = CommitGuard {
            cell: &self.cell,
            finished: false,
        };

        match self.commit().await {
            Ok(confirmation) => {
                guard.finish(CheckoutPhase::Succeeded);
                if let Err(e) = self.refresh_event().await {
                    warn!("Failed to refresh event after booking: {}", e);
                }
                Ok(confirmation)
            }
            Err(e) => {
                guard.finish(CheckoutPhase::Idle);
                Err(e)
            }
        }
    }

    async fn commit(&self) -> Result<Confirmation, CheckoutError> {
        let session = self.sessions.require().await?;
        let mut selection = self.selection.lock().await;

        let seats = selection.seats().to_vec();
        let event = selection.event().clone();
        let request = NewBooking::for_seats(session.user_id, event.id, seats.clone());

        let receipt = match self.api.create_booking(&session, &request).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.api_failure(e).await),
        };

        // Бронь уже создана сервером: сбой локального сохранения не откатывает её.
        let mut storage_warning = None;
        let added = match self.reservations.commit_occupancy(event.venue_id, &seats).await {
            Ok(added) => added,
            Err(e) => {
                error!("Booking {} created but occupancy not saved: {}", receipt.booking_id, e);
                storage_warning = Some(format!("occupancy not saved: {e}"));
                0
            }
        };
        if let Err(e) = selection.absorb_booking(&seats).await {
            error!("Booking {} created but draft not cleared: {}", receipt.booking_id, e);
            storage_warning.get_or_insert_with(|| format!("draft not cleared: {e}"));
        }

        info!(
            "Booking {} confirmed: {} seats of event {} ({} newly occupied)",
            receipt.booking_id,
            seats.len(),
            event.id,
            added
        );
        Ok(Confirmation {
            booking_id: receipt.booking_id,
            total_price: event.total_price(seats.len()),
            seats,
            storage_warning,
        })
    }

    // 401 означает истекшую сессию: забываем её и отправляем на вход.
    async fn api_failure(&self, err: ApiError) -> CheckoutError {
        if !err.is_session_expired() {
            warn!("Booking API request failed: {}", err);
            return CheckoutError::Api(err);
        }
        warn!("Session expired: {}", err);
        if let Err(e) = self.sessions.clear().await {
            error!("Failed to clear expired session: {}", e);
        }
        CheckoutError::SessionExpired {
            message: err.to_string(),
            redirect_after: self.redirect_delay,
        }
    }

    /// Перечитывает мероприятие из API и занятость площадки.
    pub async fn refresh_event(&self) -> Result<Event, CheckoutError> {
        let event_id = self.selection.lock().await.event().id;
        let event = match self.api.get_event(event_id).await {
            Ok(event) => event.normalized(),
            Err(e) => return Err(self.api_failure(e).await),
        };

        let mut selection = self.selection.lock().await;
        selection.update_event(event.clone());
        selection.refresh_occupancy().await?;
        Ok(event)
    }

    /// Отмена брони пользователем. Возвращает сообщение сервера.
    pub async fn cancel_booking(&self, booking_id: i64) -> Result<String, CheckoutError> {
        let session = self.sessions.require().await?;
        let message = match self.api.cancel_booking(&session, booking_id).await {
            Ok(message) => message,
            Err(e) => return Err(self.api_failure(e).await),
        };
        info!("Booking {} cancelled by user {}", booking_id, session.user_id);

        if let Err(e) = self.refresh_event().await {
            warn!("Failed to refresh event after cancellation: {}", e);
        }
        Ok(message)
    }

    pub async fn user_bookings(&self) -> Result<Vec<Booking>, CheckoutError> {
        let session = self.sessions.require().await?;
        match self.api.user_bookings(&session).await {
            Ok(bookings) => Ok(bookings),
            Err(e) => Err(self.api_failure(e).await),
        }
    }
}
