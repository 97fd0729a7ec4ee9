use serde::{Deserialize, Serialize};

use super::PositionSide;

/// Proposed trade direction carried by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    /// Returns the opposite direction (HOLD stays HOLD)
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
            Direction::Hold => Direction::Hold,
        }
    }

    /// Position side opened by this direction, if any
    pub fn position_side(&self) -> Option<PositionSide> {
        match self {
            Direction::Buy => Some(PositionSide::Long),
            Direction::Sell => Some(PositionSide::Short),
            Direction::Hold => None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Direction::Hold)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_position_side() {
        assert_eq!(Direction::Buy.position_side(), Some(PositionSide::Long));
        assert_eq!(Direction::Sell.position_side(), Some(PositionSide::Short));
        assert_eq!(Direction::Hold.position_side(), None);
        assert!(!Direction::Hold.is_actionable());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Sell.to_string(), "SELL");
        assert_eq!(Direction::Buy.opposite(), Direction::Sell);
    }
}
