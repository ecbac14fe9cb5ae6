// Squad state and the guarded mutations that keep it valid.
//
// Every mutation is all-or-nothing: on rejection the state is untouched.
// The caller must hold exclusive access to a manager's `SquadState` for the
// duration of a call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formation::Formation;
use crate::player::{Player, PlayerId, Position};

/// Squad cap applied while no formation is selected.
pub const UNFORMED_SQUAD_LIMIT: usize = 15;
/// Maximum number of reserves.
pub const BENCH_LIMIT: usize = 4;
/// Maximum players held across squad and bench.
pub const TOTAL_PLAYER_LIMIT: usize = 15;

// ---------------------------------------------------------------------------
// Rejection reasons
// ---------------------------------------------------------------------------

/// Why a squad mutation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquadError {
    #[error("formation {formation} allows only {limit} {position} in the squad")]
    FormationSlotFull {
        formation: String,
        position: Position,
        limit: usize,
    },

    #[error("squad is full ({limit} players)")]
    SquadFull { limit: usize },

    #[error("bench is full ({limit} players)")]
    BenchFull { limit: usize },

    #[error("price {price} exceeds remaining budget {budget}")]
    InsufficientBudget { price: u64, budget: u64 },

    #[error("player {id} is already in the squad or on the bench")]
    DuplicatePlayer { id: PlayerId },

    #[error("player {id} not found")]
    PlayerNotFound { id: PlayerId },

    #[error("cannot swap a {squad} for a {bench}: positions differ")]
    PositionMismatch { squad: Position, bench: Position },
}

impl SquadError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            SquadError::FormationSlotFull { .. } => "FORMATION_SLOT_FULL",
            SquadError::SquadFull { .. } => "SQUAD_FULL",
            SquadError::BenchFull { .. } => "BENCH_FULL",
            SquadError::InsufficientBudget { .. } => "INSUFFICIENT_BUDGET",
            SquadError::DuplicatePlayer { .. } => "DUPLICATE_PLAYER",
            SquadError::PlayerNotFound { .. } => "PLAYER_NOT_FOUND",
            SquadError::PositionMismatch { .. } => "POSITION_MISMATCH",
        }
    }
}

// ---------------------------------------------------------------------------
// SquadState
// ---------------------------------------------------------------------------

/// One manager's squad, bench, and remaining budget.
///
/// Budget is conserved: the starting budget always equals `budget` plus the
/// price of every player held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadState {
    pub squad: Vec<Player>,
    pub bench: Vec<Player>,
    pub budget: u64,
    pub selected_formation: Option<Formation>,
}

impl SquadState {
    /// An empty squad with the league's starting budget.
    pub fn new(starting_budget: u64) -> Self {
        SquadState {
            squad: Vec::new(),
            bench: Vec::new(),
            budget: starting_budget,
            selected_formation: None,
        }
    }

    /// Number of squad players at a position.
    pub fn position_count(&self, position: Position) -> usize {
        self.squad.iter().filter(|p| p.position == position).count()
    }

    /// Whether the player is held anywhere (squad or bench).
    pub fn contains(&self, id: PlayerId) -> bool {
        self.squad.iter().chain(self.bench.iter()).any(|p| p.id == id)
    }

    /// Total players held.
    pub fn player_count(&self) -> usize {
        self.squad.len() + self.bench.len()
    }

    /// Combined price of every player held.
    pub fn squad_value(&self) -> u64 {
        self.squad.iter().chain(self.bench.iter()).map(|p| p.price).sum()
    }

    fn check_budget(&self, player: &Player) -> Result<(), SquadError> {
        if self.budget < player.price {
            return Err(SquadError::InsufficientBudget {
                price: player.price,
                budget: self.budget,
            });
        }
        Ok(())
    }

    fn check_total(&self) -> Result<(), SquadError> {
        if self.player_count() >= TOTAL_PLAYER_LIMIT {
            return Err(SquadError::SquadFull {
                limit: TOTAL_PLAYER_LIMIT,
            });
        }
        Ok(())
    }

    /// Buy a player into the squad.
    ///
    /// With a formation selected the position's slot count is the limit;
    /// without one the squad may grow to [`UNFORMED_SQUAD_LIMIT`].
    pub fn add_to_squad(&mut self, player: Player) -> Result<(), SquadError> {
        match &self.selected_formation {
            Some(formation) => {
                let limit = formation.slots_for(player.position);
                if self.position_count(player.position) >= limit {
                    return Err(SquadError::FormationSlotFull {
                        formation: formation.id.clone(),
                        position: player.position,
                        limit,
                    });
                }
            }
            None => {
                if self.squad.len() >= UNFORMED_SQUAD_LIMIT {
                    return Err(SquadError::SquadFull {
                        limit: UNFORMED_SQUAD_LIMIT,
                    });
                }
            }
        }
        self.check_total()?;
        self.check_budget(&player)?;
        if self.contains(player.id) {
            return Err(SquadError::DuplicatePlayer { id: player.id });
        }

        self.budget -= player.price;
        self.squad.push(player);
        Ok(())
    }

    /// Sell a squad player, refunding their price. Returns `None` (and does
    /// nothing) if they are not in the squad.
    pub fn remove_from_squad(&mut self, id: PlayerId) -> Option<Player> {
        let idx = self.squad.iter().position(|p| p.id == id)?;
        let player = self.squad.remove(idx);
        self.budget += player.price;
        Some(player)
    }

    /// Buy a player onto the bench.
    pub fn add_to_bench(&mut self, player: Player) -> Result<(), SquadError> {
        if self.bench.len() >= BENCH_LIMIT {
            return Err(SquadError::BenchFull { limit: BENCH_LIMIT });
        }
        self.check_total()?;
        self.check_budget(&player)?;
        if self.contains(player.id) {
            return Err(SquadError::DuplicatePlayer { id: player.id });
        }

        self.budget -= player.price;
        self.bench.push(player);
        Ok(())
    }

    /// Sell a bench player, refunding their price.
    pub fn remove_from_bench(&mut self, id: PlayerId) -> Option<Player> {
        let idx = self.bench.iter().position(|p| p.id == id)?;
        let player = self.bench.remove(idx);
        self.budget += player.price;
        Some(player)
    }

    /// Swap a squad player with a bench player of the same position. Each
    /// takes the other's slot; the budget is unchanged.
    pub fn substitute(&mut self, squad_id: PlayerId, bench_id: PlayerId) -> Result<(), SquadError> {
        let squad_idx = self
            .squad
            .iter()
            .position(|p| p.id == squad_id)
            .ok_or(SquadError::PlayerNotFound { id: squad_id })?;
        let bench_idx = self
            .bench
            .iter()
            .position(|p| p.id == bench_id)
            .ok_or(SquadError::PlayerNotFound { id: bench_id })?;

        let squad_pos = self.squad[squad_idx].position;
        let bench_pos = self.bench[bench_idx].position;
        if squad_pos != bench_pos {
            return Err(SquadError::PositionMismatch {
                squad: squad_pos,
                bench: bench_pos,
            });
        }

        std::mem::swap(&mut self.squad[squad_idx], &mut self.bench[bench_idx]);
        Ok(())
    }

    /// Select a formation. Players already over the new limits stay put;
    /// only future additions are gated.
    pub fn set_formation(&mut self, formation: Formation) {
        self.selected_formation = Some(formation);
    }

    /// Squad positions that exceed the selected formation's slot counts,
    /// with the surplus for each.
    pub fn formation_overflow(&self) -> Vec<(Position, usize)> {
        let Some(formation) = &self.selected_formation else {
            return Vec::new();
        };
        Position::ALL
            .iter()
            .filter_map(|&pos| {
                let held = self.position_count(pos);
                let limit = formation.slots_for(pos);
                let surplus = held.saturating_sub(limit);
                (surplus > 0).then_some((pos, surplus))
            })
            .collect()
    }
}
