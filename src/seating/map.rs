use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use super::layout::{GridLayout, Layout, StadiumLayout};
use super::seat::{Seat, SeatId, SeatState, Subsector};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatRow {
    pub number: u32,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsectorMap {
    pub id: Subsector,
    pub rows: Vec<SeatRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorMap {
    pub letter: char,
    pub subsectors: Vec<SubsectorMap>,
}

/// Полная схема мест с вычисленным состоянием каждого места.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum SeatMap {
    Grid { rows: Vec<SeatRow> },
    Stadium { sectors: Vec<SectorMap> },
}

// Определяет состояние места по занятости и черновику. Занятость важнее выбора.
struct StateOf<'a> {
    occupied: &'a BTreeSet<SeatId>,
    selected: HashSet<&'a SeatId>,
}

impl StateOf<'_> {
    fn seat(&self, id: SeatId, row: u32, number: u32) -> Seat {
        let state = if self.occupied.contains(&id) {
            SeatState::Occupied
        } else if self.selected.contains(&id) {
            SeatState::Selected
        } else {
            SeatState::Available
        };
        Seat { id, row, number, state }
    }
}

impl SeatMap {
    /// Строит схему. Чистая функция: ничего не читает и не пишет.
    pub fn generate(
        layout: &Layout,
        total_seats: u32,
        occupied: &BTreeSet<SeatId>,
        selected: &[SeatId],
    ) -> Self {
        let state_of = StateOf {
            occupied,
            selected: selected.iter().collect(),
        };

        match layout {
            Layout::Grid(grid) => Self::grid(grid, total_seats, &state_of),
            Layout::Stadium(stadium) => Self::stadium(stadium, &state_of),
        }
    }

    fn grid(grid: &GridLayout, total_seats: u32, state_of: &StateOf<'_>) -> Self {
        let rows = (1..=grid.row_count(total_seats))
            .map(|row| SeatRow {
                number: row,
                seats: (1..=grid.row_len(row, total_seats))
                    .map(|number| state_of.seat(SeatId::grid(row, number), row, number))
                    .collect(),
            })
            .collect();
        SeatMap::Grid { rows }
    }

    fn stadium(stadium: &StadiumLayout, state_of: &StateOf<'_>) -> Self {
        let sectors = stadium
            .sectors
            .iter()
            .map(|spec| SectorMap {
                letter: spec.letter,
                subsectors: spec
                    .subsector_ids()
                    .map(|subsector| SubsectorMap {
                        id: subsector,
                        rows: (1..=spec.rows)
                            .map(|row| SeatRow {
                                number: row,
                                seats: (1..=spec.seats_per_row)
                                    .map(|number| {
                                        state_of.seat(SeatId::stadium(subsector, row, number), row, number)
                                    })
                                    .collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        SeatMap::Stadium { sectors }
    }

    pub fn seats(&self) -> Box<dyn Iterator<Item = &Seat> + '_> {
        match self {
            SeatMap::Grid { rows } => Box::new(rows.iter().flat_map(|r| r.seats.iter())),
            SeatMap::Stadium { sectors } => Box::new(
                sectors
                    .iter()
                    .flat_map(|s| s.subsectors.iter())
                    .flat_map(|s| s.rows.iter())
                    .flat_map(|r| r.seats.iter()),
            ),
        }
    }

    pub fn seat(&self, id: &SeatId) -> Option<&Seat> {
        match (self, id) {
            (SeatMap::Grid { rows }, SeatId::Grid { row, number }) => rows
                .get(usize::try_from(row.checked_sub(1)?).ok()?)?
                .seats
                .get(usize::try_from(number.checked_sub(1)?).ok()?),
            (SeatMap::Stadium { .. }, SeatId::Stadium { .. }) => self.seats().find(|s| &s.id == id),
            _ => None,
        }
    }

    /// Ряды простой схемы; для стадиона `None`.
    pub fn rows(&self) -> Option<&[SeatRow]> {
        match self {
            SeatMap::Grid { rows } => Some(rows),
            SeatMap::Stadium { .. } => None,
        }
    }

    pub fn sector(&self, letter: char) -> Option<&SectorMap> {
        match self {
            SeatMap::Grid { .. } => None,
            SeatMap::Stadium { sectors } => sectors.iter().find(|s| s.letter == letter),
        }
    }

    pub fn len(&self) -> usize {
        self.seats().count()
    }

    pub fn is_empty(&self) -> bool {
        self.seats().next().is_none()
    }

    pub fn count(&self, state: SeatState) -> usize {
        self.seats().filter(|s| s.state == state).count()
    }
}
