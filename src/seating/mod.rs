//! Схемы мест: идентификаторы, топологии площадок и генератор схемы.

pub mod layout;
pub mod map;
pub mod seat;

pub use layout::{GridLayout, Layout, SectorSpec, StadiumLayout};
pub use map::{SeatMap, SeatRow, SectorMap, SubsectorMap};
pub use seat::{Seat, SeatId, SeatIdError, SeatState, Subsector};
