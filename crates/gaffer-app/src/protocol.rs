// JSON command protocol spoken over the WebSocket.
//
// Every frame is one object tagged by `type`; field names are camelCase.

use serde::{Deserialize, Serialize};

use gaffer_core::chemistry::ChemistryReport;
use gaffer_core::formation::Formation;
use gaffer_core::manager::LeaderboardEntry;
use gaffer_core::player::{Player, PlayerId, Position};
use gaffer_core::scoring::{GameweekResult, ProviderStatLine};
use gaffer_core::squad::{SquadError, SquadState};

// ---------------------------------------------------------------------------
// Client -> engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    Register {
        manager_id: String,
        name: String,
    },
    SelectFormation {
        manager_id: String,
        formation_id: String,
    },
    AddToSquad {
        manager_id: String,
        player_id: PlayerId,
    },
    RemoveFromSquad {
        manager_id: String,
        player_id: PlayerId,
    },
    AddToBench {
        manager_id: String,
        player_id: PlayerId,
    },
    RemoveFromBench {
        manager_id: String,
        player_id: PlayerId,
    },
    Substitute {
        manager_id: String,
        squad_player_id: PlayerId,
        bench_player_id: PlayerId,
    },
    GetSquad {
        manager_id: String,
    },
    Chemistry {
        manager_id: String,
    },
    /// Simulate one manager's next gameweek.
    SimulateGameweek {
        manager_id: String,
    },
    /// Simulate the next league gameweek for every manager.
    SimulateAll,
    /// Score every manager from real stat lines. Defaults to the next
    /// league gameweek.
    RecordGameweek {
        #[serde(default)]
        gameweek: Option<u32>,
        stats: Vec<ProviderStatLine>,
    },
    /// Simulate the whole player pool and report the top scorers. Nothing
    /// is persisted.
    ScorePool {
        #[serde(default)]
        gameweek: Option<u32>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Leaderboard,
    History {
        manager_id: String,
    },
    ListFormations,
    ListPlayers {
        #[serde(default)]
        position: Option<Position>,
    },
}

// ---------------------------------------------------------------------------
// Engine -> client
// ---------------------------------------------------------------------------

/// Formation slots a squad currently exceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormationOverflow {
    pub position: Position,
    pub surplus: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadSnapshot {
    pub manager_id: String,
    pub name: String,
    pub state: SquadState,
    pub squad_value: u64,
    pub overflow: Vec<FormationOverflow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerScore {
    pub manager_id: String,
    pub name: String,
    pub total_points: i32,
    pub bench_points: i32,
    pub season_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopScorer {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Position,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Response {
    Squad(SquadSnapshot),
    Chemistry {
        manager_id: String,
        report: ChemistryReport,
    },
    Gameweek {
        manager_id: String,
        result: GameweekResult,
    },
    GameweekComplete {
        gameweek: u32,
        scores: Vec<ManagerScore>,
    },
    PoolScored {
        gameweek: u32,
        players_scored: usize,
        top_scorers: Vec<TopScorer>,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    History {
        manager_id: String,
        total_points: i64,
        history: Vec<GameweekResult>,
    },
    Formations {
        formations: Vec<Formation>,
    },
    Players {
        players: Vec<Player>,
    },
    /// A squad mutation was refused; nothing changed.
    Rejected {
        code: String,
        reason: String,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn rejected(err: &SquadError) -> Self {
        Response::Rejected {
            code: err.code().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| serialize_failure(&e))
    }
}

fn serialize_failure(err: &dyn std::fmt::Display) -> String {
    serde_json::json!({
        "type": "ERROR",
        "message": format!("failed to serialize response: {err}"),
    })
    .to_string()
}
