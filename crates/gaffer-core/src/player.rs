// Player reference data: positions, skill attributes, and pricing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable player identifier from the reference catalog.
pub type PlayerId = u32;

/// Football positions. Every player has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "ATT")]
    Attacker,
}

impl Position {
    /// All positions in lineup order (goal to attack).
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Attacker,
    ];

    /// Parse a position string into a Position enum.
    ///
    /// Accepts the short codes used in the catalog ("GK", "DEF", "MID", "ATT")
    /// as well as common long forms ("goalkeeper", "forward", "FWD", ...).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "GKP" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "DEF" | "DF" | "DEFENDER" => Some(Position::Defender),
            "MID" | "MF" | "MIDFIELDER" => Some(Position::Midfielder),
            "ATT" | "FWD" | "FW" | "ATTACKER" | "FORWARD" => Some(Position::Attacker),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Attacker => "ATT",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// The six skill attributes, conventionally 0-99.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub pace: u8,
    pub shooting: u8,
    pub passing: u8,
    pub defending: u8,
    pub dribbling: u8,
    pub physical: u8,
}

impl Attributes {
    /// Position-weighted overall rating.
    ///
    /// Weights are in tenths and sum to 10 for every position, so the result
    /// stays within the attribute range.
    pub fn rating_for(&self, position: Position) -> u8 {
        // pace, shooting, passing, defending, dribbling, physical
        let weights: [u32; 6] = match position {
            Position::Goalkeeper => [1, 0, 2, 4, 0, 3],
            Position::Defender => [2, 0, 1, 4, 0, 3],
            Position::Midfielder => [1, 2, 3, 1, 2, 1],
            Position::Attacker => [2, 4, 1, 0, 2, 1],
        };
        let values = [
            self.pace,
            self.shooting,
            self.passing,
            self.defending,
            self.dribbling,
            self.physical,
        ];
        let weighted: u32 = values
            .iter()
            .zip(weights.iter())
            .map(|(&v, &w)| u32::from(v) * w)
            .sum();
        // Round half up; max is 255 * 10 / 10 so the cast cannot truncate.
        ((weighted + 5) / 10) as u8
    }
}

/// A player from the reference catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub club: String,
    pub nationality: String,
    pub attributes: Attributes,
    pub rating: u8,
    /// Price in the smallest currency unit.
    pub price: u64,
}

impl Player {
    /// Build a player whose rating is derived from their attributes.
    pub fn with_derived_rating(
        id: PlayerId,
        name: impl Into<String>,
        position: Position,
        club: impl Into<String>,
        nationality: impl Into<String>,
        attributes: Attributes,
        price: u64,
    ) -> Self {
        Player {
            id,
            name: name.into(),
            position,
            club: club.into(),
            nationality: nationality.into(),
            rating: attributes.rating_for(position),
            attributes,
            price,
        }
    }
}
