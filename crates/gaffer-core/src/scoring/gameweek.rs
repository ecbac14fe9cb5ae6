// Gameweek simulation: score a whole squad (or a whole player pool) for one
// round of fixtures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::points::{calculate_points, MatchStats, PointsBreakdown};
use super::stats::StatSource;
use crate::player::{Player, PlayerId, Position};

/// One player's gameweek: their stats and what they were worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameweek {
    pub points: i32,
    pub position: Position,
    /// Bench players are scored but never counted towards the total.
    pub on_bench: bool,
    pub stats: MatchStats,
    pub breakdown: PointsBreakdown,
}

/// A manager's scored gameweek.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameweekResult {
    pub gameweek: u32,
    /// Always equal to `squad_points`; the bench never contributes.
    pub total_points: i32,
    pub squad_points: i32,
    pub bench_points: i32,
    pub player_stats: BTreeMap<PlayerId, PlayerGameweek>,
    pub date: DateTime<Utc>,
}

/// Every player in a pool, scored for one gameweek.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolGameweek {
    pub gameweek: u32,
    pub player_points: BTreeMap<PlayerId, PlayerGameweek>,
    pub date: DateTime<Utc>,
}

impl PoolGameweek {
    /// The `n` highest-scoring players, best first. Ties go to the lower id.
    pub fn top_scorers(&self, n: usize) -> Vec<(PlayerId, i32)> {
        let mut scored: Vec<(PlayerId, i32)> = self
            .player_points
            .iter()
            .map(|(&id, p)| (id, p.points))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }
}

fn score_player<S: StatSource + ?Sized>(player: &Player, on_bench: bool, source: &mut S) -> PlayerGameweek {
    let stats = source.stats_for(player);
    let breakdown = calculate_points(&stats, player.position);
    PlayerGameweek {
        points: breakdown.total,
        position: player.position,
        on_bench,
        stats,
        breakdown,
    }
}

/// Score a squad and bench for one gameweek.
///
/// Every squad and bench player appears in `player_stats`, including those
/// who scored nothing. Bench points are tracked separately and do not
/// substitute in for blank starters.
pub fn simulate_gameweek<S: StatSource + ?Sized>(
    squad: &[Player],
    bench: &[Player],
    gameweek: u32,
    source: &mut S,
) -> GameweekResult {
    let mut player_stats = BTreeMap::new();

    let mut squad_points = 0;
    for player in squad {
        let scored = score_player(player, false, source);
        squad_points += scored.points;
        player_stats.insert(player.id, scored);
    }

    let mut bench_points = 0;
    for player in bench {
        let scored = score_player(player, true, source);
        bench_points += scored.points;
        player_stats.insert(player.id, scored);
    }

    debug!(
        "gameweek {}: {} squad points, {} bench points across {} players",
        gameweek,
        squad_points,
        bench_points,
        player_stats.len()
    );

    GameweekResult {
        gameweek,
        total_points: squad_points,
        squad_points,
        bench_points,
        player_stats,
        date: Utc::now(),
    }
}

/// Score every player in a pool for one gameweek, with no squad/bench split.
pub fn simulate_player_pool<S: StatSource + ?Sized>(
    players: &[Player],
    gameweek: u32,
    source: &mut S,
) -> PoolGameweek {
    let player_points: BTreeMap<PlayerId, PlayerGameweek> = players
        .iter()
        .map(|p| (p.id, score_player(p, false, source)))
        .collect();

    debug!("gameweek {}: scored pool of {} players", gameweek, player_points.len());

    PoolGameweek {
        gameweek,
        player_points,
        date: Utc::now(),
    }
}
