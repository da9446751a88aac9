use serde::{Deserialize, Serialize};

use super::seat::{SeatId, Subsector};
use crate::config::SeatingConfig;
use crate::models::Venue;

/// Простая схема зала: ряды по `seats_per_row` мест, не более `max_rows` рядов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub max_rows: u32,
    pub seats_per_row: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { max_rows: 10, seats_per_row: 10 }
    }
}

impl GridLayout {
    /// Сколько мест реально попадает на схему при заявленном `total_seats`.
    pub fn capacity(&self, total_seats: u32) -> u32 {
        total_seats.min(self.max_rows.saturating_mul(self.seats_per_row))
    }

    pub fn row_count(&self, total_seats: u32) -> u32 {
        if self.seats_per_row == 0 {
            return 0;
        }
        self.max_rows.min(total_seats.div_ceil(self.seats_per_row))
    }

    /// Длина ряда `row`: последний ряд может быть неполным.
    pub fn row_len(&self, row: u32, total_seats: u32) -> u32 {
        if row == 0 || row > self.row_count(total_seats) {
            return 0;
        }
        let before = (row - 1) * self.seats_per_row;
        (self.capacity(total_seats) - before).min(self.seats_per_row)
    }

    pub fn contains(&self, row: u32, number: u32, total_seats: u32) -> bool {
        number >= 1 && number <= self.row_len(row, total_seats)
    }
}

/// Сектор стадиона: одинаковые подсекторы с заданным числом рядов и мест.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorSpec {
    pub letter: char,
    pub subsectors: u8,
    pub rows: u32,
    pub seats_per_row: u32,
}

impl SectorSpec {
    pub fn subsector_ids(&self) -> impl Iterator<Item = Subsector> + '_ {
        (1..=self.subsectors).map(move |index| Subsector::new(self.letter, index))
    }

    pub fn capacity(&self) -> u32 {
        u32::from(self.subsectors) * self.rows * self.seats_per_row
    }
}

/// Многосекторная схема стадиона: секторы -> подсекторы -> ряды -> места.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StadiumLayout {
    pub sectors: Vec<SectorSpec>,
}

impl StadiumLayout {
    /// Трибуны "Astana Arena": A и C длиннее и глубже, чем B и D.
    pub fn astana_arena() -> Self {
        let sectors = ['A', 'B', 'C', 'D']
            .into_iter()
            .map(|letter| {
                let long_stand = matches!(letter, 'A' | 'C');
                SectorSpec {
                    letter,
                    subsectors: 10,
                    rows: if long_stand { 15 } else { 12 },
                    seats_per_row: if long_stand { 20 } else { 15 },
                }
            })
            .collect();
        Self { sectors }
    }

    pub fn sector(&self, letter: char) -> Option<&SectorSpec> {
        self.sectors.iter().find(|s| s.letter == letter)
    }

    pub fn capacity(&self) -> u32 {
        self.sectors.iter().map(SectorSpec::capacity).sum()
    }

    pub fn contains(&self, subsector: Subsector, row: u32, number: u32) -> bool {
        self.sector(subsector.sector).is_some_and(|spec| {
            (1..=spec.subsectors).contains(&subsector.index)
                && (1..=spec.rows).contains(&row)
                && (1..=spec.seats_per_row).contains(&number)
        })
    }
}

/// Топология мест площадки.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Layout {
    Grid(GridLayout),
    Stadium(StadiumLayout),
}

impl Layout {
    /// Выбирает схему для площадки: стадионная для перечисленных в конфиге, иначе сетка.
    pub fn for_venue(venue: &Venue, config: &SeatingConfig) -> Self {
        let is_stadium = config
            .stadium_venues
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(venue.name.trim()));

        if is_stadium {
            Layout::Stadium(StadiumLayout::astana_arena())
        } else {
            Layout::Grid(GridLayout {
                max_rows: config.grid_max_rows,
                seats_per_row: config.grid_seats_per_row,
            })
        }
    }

    /// Адресуемо ли место в этой схеме при заявленном числе мест.
    pub fn contains(&self, seat: &SeatId, total_seats: u32) -> bool {
        match (self, seat) {
            (Layout::Grid(grid), SeatId::Grid { row, number }) => grid.contains(*row, *number, total_seats),
            (Layout::Stadium(stadium), SeatId::Stadium { subsector, row, number }) => {
                stadium.contains(*subsector, *row, *number)
            }
            _ => false,
        }
    }

    pub fn capacity(&self, total_seats: u32) -> u32 {
        match self {
            Layout::Grid(grid) => grid.capacity(total_seats),
            Layout::Stadium(stadium) => stadium.capacity(),
        }
    }
}
