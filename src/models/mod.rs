use thiserror::Error;

/// Строковое значение, которое не соответствует ни одному варианту перечисления.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// Перечисления, которые ходят по проводу и лежат в БД строками в нижнем регистре.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err($crate::models::UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod user;
pub mod event;
pub mod venue;
pub mod booking;
pub mod notification;

pub use user::{User, UserRecord, UserRole};
pub use event::{Event, EventFilter, EventMedia, EventRow, EventStatus, EventType};
pub use venue::Venue;
pub use booking::{Booking, BookingReceipt, BookingRow, BookingStatus, NewBooking};
pub use notification::{NewNotification, Notification, NotificationPage, NotificationRow, NotificationType};
