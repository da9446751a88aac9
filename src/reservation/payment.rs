//! Имитация платёжного шлюза: обратный отсчёт, который завершается ровно один раз.

use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PaymentConfig;

/// Итог платёжной сессии.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Confirm,
    Cancel,
}

const MIN_TICK: Duration = Duration::from_millis(1);

/// Параметры отсчёта; запускает [`PaymentSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentGate {
    countdown: u32,
    tick: Duration,
}

impl Default for PaymentGate {
    fn default() -> Self {
        Self::from_config(&PaymentConfig::default())
    }
}

impl PaymentGate {
    /// Тик не короче 1 мс.
    pub fn new(countdown: u32, tick: Duration) -> Self {
        Self {
            countdown,
            tick: tick.max(MIN_TICK),
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.countdown, Duration::from_millis(config.tick_ms))
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn start(&self) -> PaymentSession {
        let id = Uuid::new_v4();
        let (remaining_tx, remaining) = watch::channel(self.countdown);
        let (signal_tx, signals) = mpsc::unbounded_channel();

        info!("Payment session {} started: {} ticks", id, self.countdown);
        let task = tokio::spawn(run_countdown(id, self.countdown, self.tick, remaining_tx, signals));

        PaymentSession {
            id,
            remaining,
            control: PaymentControl { signals: signal_tx },
            alive: Arc::new(()),
            task,
        }
    }
}

async fn run_countdown(
    id: Uuid,
    countdown: u32,
    tick: Duration,
    remaining: watch::Sender<u32>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
) -> PaymentOutcome {
    let mut ticker = time::interval_at(Instant::now() + tick, tick);
    let mut left = countdown;

    let outcome = loop {
        if left == 0 {
            break PaymentOutcome::Succeeded;
        }
        tokio::select! {
            biased;
            signal = signals.recv() => match signal {
                Some(Signal::Confirm) => break PaymentOutcome::Succeeded,
                Some(Signal::Cancel) | None => break PaymentOutcome::Cancelled,
            },
            _ = ticker.tick() => {
                left -= 1;
                remaining.send_replace(left);
            }
        }
    };

    debug!("Payment session {} resolved: {:?}", id, outcome);
    outcome
}

/// Управление сессией из другой задачи (кнопка "оплатить", закрытие диалога).
#[derive(Debug, Clone)]
pub struct PaymentControl {
    signals: mpsc::UnboundedSender<Signal>,
}

impl PaymentControl {
    /// Подтвердить оплату досрочно. `false`, если сессия уже завершилась.
    pub fn confirm(&self) -> bool {
        self.signals.send(Signal::Confirm).is_ok()
    }

    /// Отменить оплату. `false`, если сессия уже завершилась.
    pub fn cancel(&self) -> bool {
        self.signals.send(Signal::Cancel).is_ok()
    }
}

/// Запущенный отсчёт. Удаление сессии останавливает её задачу.
#[derive(Debug)]
pub struct PaymentSession {
    id: Uuid,
    remaining: watch::Receiver<u32>,
    control: PaymentControl,
    alive: Arc<()>,
    task: JoinHandle<PaymentOutcome>,
}

impl PaymentSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Сколько тиков осталось.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn control(&self) -> PaymentControl {
        self.control.clone()
    }

    pub fn confirm(&self) -> bool {
        self.control.confirm()
    }

    pub fn cancel(&self) -> bool {
        self.control.cancel()
    }

    // Слабая ссылка гаснет, когда сессия и все её удержания удалены.
    pub(crate) fn liveness(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }

    // Держит сессию живой для оформления, пока ждём её итог.
    pub(crate) fn keep_alive(&self) -> Arc<()> {
        self.alive.clone()
    }

    /// Ждёт завершения. Поглощает сессию, поэтому итог получают один раз.
    pub async fn outcome(mut self) -> PaymentOutcome {
        (&mut self.task).await.unwrap_or(PaymentOutcome::Cancelled)
    }
}

impl Drop for PaymentSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn zero_countdown_succeeds_immediately() {
        let session = PaymentGate::new(0, Duration::from_secs(1)).start();
        assert_eq!(session.outcome().await, PaymentOutcome::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_is_clamped_instead_of_cancelling() {
        let gate = PaymentGate::from_config(&PaymentConfig { countdown: 3, tick_ms: 0 });
        assert_eq!(gate.tick, MIN_TICK);
        assert_eq!(gate.start().outcome().await, PaymentOutcome::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn liveness_ends_with_the_session() {
        let session = PaymentGate::new(5, Duration::from_secs(1)).start();
        let weak = session.liveness();
        let held = session.keep_alive();
        drop(session);
        assert!(weak.upgrade().is_some());
        drop(held);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn control_reports_finished_session() {
        let session = PaymentGate::new(1, Duration::from_millis(10)).start();
        let control = session.control();
        assert_eq!(session.outcome().await, PaymentOutcome::Succeeded);
        assert!(!control.cancel());
    }
}
