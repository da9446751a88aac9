//! Ошибки библиотечной части: хранилище, REST-клиент, выбор мест, оформление брони.

use std::time::Duration;
use thiserror::Error;

use crate::seating::SeatId;

/// Ошибки локального хранилища (черновики, занятость, сессия).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to encode stored record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Ошибки обращения к REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: нет токена, токен истёк или невалиден.
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Любой другой неуспешный ответ сервера с его сообщением.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("booking service temporarily unavailable")]
    CircuitOpen,
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Истекшая или невалидная сессия.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

/// Ошибки сессии пользователя.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("please log in to continue")]
    NotAuthenticated,
    #[error("administrator rights required")]
    AdminRequired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Отказы машины выбора мест. Ни один из них не меняет черновик.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("seat {0} is already taken")]
    SeatTaken(SeatId),
    #[error("seat {0} does not exist at this venue")]
    UnknownSeat(SeatId),
    #[error("seat selection is locked while a payment is in progress")]
    Locked,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Класс ошибки оформления: определяет, как её показывать пользователю.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Api,
    Conflict,
    Storage,
}

/// Ошибки оформления бронирования.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("please log in to book seats")]
    LoginRequired,
    #[error("select at least one seat")]
    EmptySelection,
    #[error("only {available} seats are available, {requested} selected")]
    NotEnoughSeats { requested: usize, available: u32 },
    #[error("session expired: {message}")]
    SessionExpired { message: String, redirect_after: Duration },
    #[error("a payment is already in progress")]
    PaymentInProgress,
    #[error("no payment is awaiting confirmation")]
    NotAwaitingPayment,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::EmptySelection
            | CheckoutError::NotEnoughSeats { .. } => ErrorKind::Validation,
            CheckoutError::Selection(SelectionError::Store(_)) => ErrorKind::Storage,
            CheckoutError::Selection(_) => ErrorKind::Validation,
            CheckoutError::LoginRequired | CheckoutError::SessionExpired { .. } => {
                ErrorKind::Authorization
            }
            CheckoutError::PaymentInProgress | CheckoutError::NotAwaitingPayment => {
                ErrorKind::Conflict
            }
            CheckoutError::Api(_) => ErrorKind::Api,
            CheckoutError::Store(_) => ErrorKind::Storage,
        }
    }

    /// Через сколько перевести пользователя на страницу входа, если это нужно.
    pub fn login_redirect(&self) -> Option<Duration> {
        match self {
            CheckoutError::LoginRequired => Some(Duration::ZERO),
            CheckoutError::SessionExpired { redirect_after, .. } => Some(*redirect_after),
            _ => None,
        }
    }
}

impl From<AuthError> for CheckoutError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => CheckoutError::Store(e),
            AuthError::NotAuthenticated | AuthError::AdminRequired => CheckoutError::LoginRequired,
        }
    }
}
