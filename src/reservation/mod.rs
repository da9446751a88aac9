//! Клиентский сценарий бронирования: выбор мест, оплата, отправка брони.

pub mod checkout;
pub mod payment;
pub mod selection;

pub use checkout::{BookingFlow, CheckoutOutcome, CheckoutPhase, Confirmation};
pub use payment::{PaymentControl, PaymentGate, PaymentOutcome, PaymentSession};
pub use selection::{SelectOutcome, Selection};
