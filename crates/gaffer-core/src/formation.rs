// Formations: how the eleven starting slots split across positions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::Position;

/// Number of players in a starting lineup.
pub const STARTING_XI: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormationError {
    #[error("invalid formation shape `{0}`: expected DEF-MID-ATT counts such as 4-4-2")]
    InvalidShape(String),

    #[error("formation counts sum to {0}, expected 11")]
    WrongTotal(usize),

    #[error("formation must field exactly one goalkeeper, got {0}")]
    GoalkeeperCount(usize),
}

/// Required slot count for each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionCounts {
    #[serde(rename = "GK")]
    pub goalkeepers: usize,
    #[serde(rename = "DEF")]
    pub defenders: usize,
    #[serde(rename = "MID")]
    pub midfielders: usize,
    #[serde(rename = "ATT")]
    pub attackers: usize,
}

impl PositionCounts {
    pub fn get(&self, position: Position) -> usize {
        match position {
            Position::Goalkeeper => self.goalkeepers,
            Position::Defender => self.defenders,
            Position::Midfielder => self.midfielders,
            Position::Attacker => self.attackers,
        }
    }

    pub fn total(&self) -> usize {
        self.goalkeepers + self.defenders + self.midfielders + self.attackers
    }
}

/// A named distribution of the starting XI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub id: String,
    pub name: String,
    pub positions: PositionCounts,
}

impl Formation {
    /// Build a formation, checking that the counts describe a full lineup
    /// with a single goalkeeper.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        positions: PositionCounts,
    ) -> Result<Self, FormationError> {
        if positions.total() != STARTING_XI {
            return Err(FormationError::WrongTotal(positions.total()));
        }
        if positions.goalkeepers != 1 {
            return Err(FormationError::GoalkeeperCount(positions.goalkeepers));
        }
        Ok(Formation {
            id: id.into(),
            name: name.into(),
            positions,
        })
    }

    /// Parse an outfield shape like `"4-4-2"` (defenders, midfielders,
    /// attackers; the goalkeeper is implied). The shape string becomes the id.
    pub fn parse(shape: &str) -> Result<Self, FormationError> {
        let shape = shape.trim();
        let counts: Vec<usize> = shape
            .split('-')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| FormationError::InvalidShape(shape.to_string()))?;

        let (defenders, midfielders, attackers) = match counts.as_slice() {
            [d, m, a] => (*d, *m, *a),
            _ => return Err(FormationError::InvalidShape(shape.to_string())),
        };

        Formation::new(
            shape,
            shape,
            PositionCounts {
                goalkeepers: 1,
                defenders,
                midfielders,
                attackers,
            },
        )
    }

    /// Required count for a position.
    pub fn slots_for(&self, position: Position) -> usize {
        self.positions.get(position)
    }
}

/// The formations offered when a league does not configure its own.
pub fn standard_formations() -> Vec<Formation> {
    ["4-4-2", "4-3-3", "4-5-1", "3-5-2", "3-4-3", "5-3-2", "5-4-1"]
        .iter()
        .filter_map(|shape| Formation::parse(shape).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_four_four_two() {
        let f = Formation::parse("4-4-2").unwrap();
        assert_eq!(f.id, "4-4-2");
        assert_eq!(f.slots_for(Position::Goalkeeper), 1);
        assert_eq!(f.slots_for(Position::Defender), 4);
        assert_eq!(f.slots_for(Position::Midfielder), 4);
        assert_eq!(f.slots_for(Position::Attacker), 2);
        assert_eq!(f.positions.total(), STARTING_XI);
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert_eq!(
            Formation::parse("4-4"),
            Err(FormationError::InvalidShape("4-4".into()))
        );
        assert_eq!(
            Formation::parse("4-x-2"),
            Err(FormationError::InvalidShape("4-x-2".into()))
        );
        assert_eq!(Formation::parse("4-4-3"), Err(FormationError::WrongTotal(12)));
    }

    #[test]
    fn new_rejects_two_goalkeepers() {
        let counts = PositionCounts {
            goalkeepers: 2,
            defenders: 4,
            midfielders: 3,
            attackers: 2,
        };
        assert_eq!(
            Formation::new("odd", "Odd", counts),
            Err(FormationError::GoalkeeperCount(2))
        );
    }

    #[test]
    fn standard_formations_are_all_valid() {
        let all = standard_formations();
        assert_eq!(all.len(), 7);
        for f in &all {
            assert_eq!(f.positions.total(), STARTING_XI, "{}", f.id);
        }
    }

    #[test]
    fn counts_serialize_with_position_codes() {
        let f = Formation::parse("3-5-2").unwrap();
        let json = serde_json::to_value(&f.positions).unwrap();
        assert_eq!(json["GK"], 1);
        assert_eq!(json["DEF"], 3);
        assert_eq!(json["MID"], 5);
        assert_eq!(json["ATT"], 2);
    }
}
