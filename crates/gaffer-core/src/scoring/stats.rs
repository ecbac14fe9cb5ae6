// Match statistics sources: seeded simulation and recorded provider data.
//
// Both produce the same `MatchStats` shape, so the points calculator never
// needs to know where a stat line came from.

use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::points::MatchStats;
use crate::player::{Player, PlayerId, Position};

// ---------------------------------------------------------------------------
// StatSource trait
// ---------------------------------------------------------------------------

/// Anything that can produce one gameweek's statistics for a player.
pub trait StatSource {
    fn stats_for(&mut self, player: &Player) -> MatchStats;
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

const FULL_MATCH_MINUTES: u16 = 90;
const FULL_MATCH_CHANCE: f64 = 0.9;
const ASSIST_CHANCE: f64 = 0.2;
const PENALTY_SAVE_CHANCE: f64 = 0.05;
const YELLOW_CARD_CHANCE: f64 = 0.15;
const RED_CARD_CHANCE: f64 = 0.02;
const OWN_GOAL_CHANCE: f64 = 0.01;
const MAX_GOALKEEPER_SAVES: u8 = 5;

fn goal_chance(position: Position) -> f64 {
    match position {
        Position::Attacker => 0.35,
        Position::Midfielder => 0.2,
        Position::Defender => 0.05,
        Position::Goalkeeper => 0.01,
    }
}

fn clean_sheet_chance(position: Position) -> f64 {
    match position {
        Position::Goalkeeper | Position::Defender => 0.3,
        Position::Midfielder | Position::Attacker => 0.1,
    }
}

/// Produce a position-weighted random stat line.
///
/// Placeholder policy: the distributions are not fitted to real football,
/// but every field stays within the ranges the calculator expects.
pub fn generate_random_stats<R: Rng + ?Sized>(position: Position, rng: &mut R) -> MatchStats {
    let minutes_played = if rng.gen_bool(FULL_MATCH_CHANCE) {
        FULL_MATCH_MINUTES
    } else {
        rng.gen_range(0..FULL_MATCH_MINUTES)
    };

    let is_goalkeeper = position == Position::Goalkeeper;
    let clean_sheet = rng.gen_bool(clean_sheet_chance(position));

    MatchStats {
        minutes_played,
        goals: u8::from(rng.gen_bool(goal_chance(position))),
        assists: u8::from(rng.gen_bool(ASSIST_CHANCE)),
        clean_sheet,
        saves: if is_goalkeeper {
            rng.gen_range(0..=MAX_GOALKEEPER_SAVES)
        } else {
            0
        },
        penalties_saved: u8::from(is_goalkeeper && rng.gen_bool(PENALTY_SAVE_CHANCE)),
        yellow_cards: u8::from(rng.gen_bool(YELLOW_CARD_CHANCE)),
        red_cards: u8::from(rng.gen_bool(RED_CARD_CHANCE)),
        own_goals: u8::from(rng.gen_bool(OWN_GOAL_CHANCE)),
        goals_conceded: if clean_sheet { 0 } else { rng.gen_range(1..=3) },
    }
}

/// Random stats drawn from an injected generator.
#[derive(Debug, Clone)]
pub struct SimulatedStats<R> {
    rng: R,
}

impl<R: Rng> SimulatedStats<R> {
    pub fn new(rng: R) -> Self {
        SimulatedStats { rng }
    }
}

impl SimulatedStats<ChaCha8Rng> {
    /// Reproducible simulation from a 64-bit seed.
    pub fn seeded(seed: u64) -> Self {
        SimulatedStats::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> StatSource for SimulatedStats<R> {
    fn stats_for(&mut self, player: &Player) -> MatchStats {
        generate_random_stats(player.position, &mut self.rng)
    }
}

// ---------------------------------------------------------------------------
// Recorded (real) statistics
// ---------------------------------------------------------------------------

/// A stat line as an external provider reports it. Fields may be missing or
/// out of range; [`ProviderStatLine::normalize`] turns it into `MatchStats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatLine {
    pub player_id: PlayerId,
    #[serde(default)]
    pub minutes_played: Option<i64>,
    #[serde(default)]
    pub goals: Option<i64>,
    #[serde(default)]
    pub assists: Option<i64>,
    #[serde(default)]
    pub clean_sheet: Option<bool>,
    #[serde(default)]
    pub saves: Option<i64>,
    #[serde(default)]
    pub penalties_saved: Option<i64>,
    #[serde(default)]
    pub yellow_cards: Option<i64>,
    #[serde(default)]
    pub red_cards: Option<i64>,
    #[serde(default)]
    pub own_goals: Option<i64>,
    #[serde(default)]
    pub goals_conceded: Option<i64>,
}

fn clamp_u8(value: Option<i64>) -> u8 {
    value.unwrap_or(0).clamp(0, i64::from(u8::MAX)) as u8
}

fn clamp_u16(value: Option<i64>) -> u16 {
    value.unwrap_or(0).clamp(0, i64::from(u16::MAX)) as u16
}

impl ProviderStatLine {
    /// Clamp into the unsigned stat ranges. Missing counts become zero and a
    /// missing clean-sheet flag is derived from minutes and goals conceded.
    pub fn normalize(&self) -> MatchStats {
        let minutes_played = clamp_u16(self.minutes_played);
        let goals_conceded = clamp_u8(self.goals_conceded);
        let clean_sheet = self
            .clean_sheet
            .unwrap_or(minutes_played > 0 && goals_conceded == 0);

        MatchStats {
            minutes_played,
            goals: clamp_u8(self.goals),
            assists: clamp_u8(self.assists),
            clean_sheet,
            saves: clamp_u8(self.saves),
            penalties_saved: clamp_u8(self.penalties_saved),
            yellow_cards: clamp_u8(self.yellow_cards),
            red_cards: clamp_u8(self.red_cards),
            own_goals: clamp_u8(self.own_goals),
            goals_conceded,
        }
    }
}

/// Stats taken from provider data for one gameweek. A player with no line
/// did not play.
#[derive(Debug, Clone, Default)]
pub struct RecordedStats {
    lines: HashMap<PlayerId, MatchStats>,
}

impl RecordedStats {
    /// A later line for the same player replaces an earlier one.
    pub fn from_lines(lines: &[ProviderStatLine]) -> Self {
        let lines = lines.iter().map(|line| (line.player_id, line.normalize())).collect();
        RecordedStats { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl StatSource for RecordedStats {
    fn stats_for(&mut self, player: &Player) -> MatchStats {
        self.lines.get(&player.id).copied().unwrap_or_default()
    }
}
