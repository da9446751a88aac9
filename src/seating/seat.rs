use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatIdError {
    #[error("malformed seat id '{0}'")]
    Malformed(String),
    #[error("malformed subsector '{0}'")]
    Subsector(String),
}

/// Подсектор стадиона: буква сектора и номер внутри него, например `B3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subsector {
    pub sector: char,
    pub index: u8,
}

impl Subsector {
    pub fn new(sector: char, index: u8) -> Self {
        Self { sector, index }
    }
}

impl fmt::Display for Subsector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sector, self.index)
    }
}

impl Serialize for Subsector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Subsector {
    type Err = SeatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let sector = chars
            .next()
            .filter(char::is_ascii_uppercase)
            .ok_or_else(|| SeatIdError::Subsector(s.to_string()))?;
        let index = chars
            .as_str()
            .parse::<u8>()
            .ok()
            .filter(|i| *i > 0)
            .ok_or_else(|| SeatIdError::Subsector(s.to_string()))?;
        Ok(Subsector { sector, index })
    }
}

/// Составной идентификатор места.
///
/// В простой схеме зала это `"{ряд}-{место}"`, на стадионе
/// `"{подсектор}-{ряд}-{место}"`. Ряды и места нумеруются с единицы.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SeatId {
    Grid { row: u32, number: u32 },
    Stadium { subsector: Subsector, row: u32, number: u32 },
}

impl SeatId {
    pub fn grid(row: u32, number: u32) -> Self {
        SeatId::Grid { row, number }
    }

    pub fn stadium(subsector: Subsector, row: u32, number: u32) -> Self {
        SeatId::Stadium { subsector, row, number }
    }

    pub fn row(&self) -> u32 {
        match self {
            SeatId::Grid { row, .. } | SeatId::Stadium { row, .. } => *row,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            SeatId::Grid { number, .. } | SeatId::Stadium { number, .. } => *number,
        }
    }

    pub fn subsector(&self) -> Option<Subsector> {
        match self {
            SeatId::Grid { .. } => None,
            SeatId::Stadium { subsector, .. } => Some(*subsector),
        }
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatId::Grid { row, number } => write!(f, "{row}-{number}"),
            SeatId::Stadium { subsector, row, number } => write!(f, "{subsector}-{row}-{number}"),
        }
    }
}

fn parse_position(raw: &str, whole: &str) -> Result<u32, SeatIdError> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| SeatIdError::Malformed(whole.to_string()))
}

impl FromStr for SeatId {
    type Err = SeatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        match parts.as_slice() {
            [row, number] => Ok(SeatId::Grid {
                row: parse_position(row, s)?,
                number: parse_position(number, s)?,
            }),
            [subsector, row, number] => Ok(SeatId::Stadium {
                subsector: subsector.parse()?,
                row: parse_position(row, s)?,
                number: parse_position(number, s)?,
            }),
            _ => Err(SeatIdError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(id: SeatId) -> Self {
        id.to_string()
    }
}

/// Состояние места на схеме. Вычисляется при построении схемы, не хранится.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Selected,
    Occupied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub id: SeatId,
    pub row: u32,
    pub number: u32,
    pub state: SeatState,
}

impl Seat {
    pub fn is_occupied(&self) -> bool {
        self.state == SeatState::Occupied
    }

    pub fn is_selected(&self) -> bool {
        self.state == SeatState::Selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grid_and_stadium_ids() {
        assert_eq!("3-4".parse::<SeatId>().unwrap(), SeatId::grid(3, 4));
        assert_eq!(
            "B3-2-7".parse::<SeatId>().unwrap(),
            SeatId::stadium(Subsector::new('B', 3), 2, 7)
        );
        assert_eq!(SeatId::stadium(Subsector::new('A', 10), 15, 20).to_string(), "A10-15-20");
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "3", "0-1", "1-0", "x-1", "b3-1-1", "B0-1-1", "B3-1-1-1", "B-1-1"] {
            assert!(raw.parse::<SeatId>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&vec![SeatId::grid(1, 2)]).unwrap();
        assert_eq!(json, r#"["1-2"]"#);
        let back: Vec<SeatId> = serde_json::from_str(r#"["C1-1-1"]"#).unwrap();
        assert_eq!(back[0].subsector(), Some(Subsector::new('C', 1)));
    }
}
