// Managers: a squad plus an append-only gameweek history, and leaderboard
// ranking across managers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::gameweek::GameweekResult;
use crate::scoring::stats::StatSource;
use crate::scoring::simulate_gameweek;
use crate::squad::SquadState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("gameweek {gameweek} already recorded or out of order (last recorded: {last})")]
    OutOfOrder { gameweek: u32, last: u32 },
}

/// A manager's squad and season so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub id: String,
    pub name: String,
    pub squad: SquadState,
    /// Ordered by gameweek, strictly increasing.
    pub history: Vec<GameweekResult>,
    /// Running sum of every recorded gameweek's `total_points`.
    pub total_points: i64,
}

impl Manager {
    pub fn new(id: impl Into<String>, name: impl Into<String>, starting_budget: u64) -> Self {
        Manager {
            id: id.into(),
            name: name.into(),
            squad: SquadState::new(starting_budget),
            history: Vec::new(),
            total_points: 0,
        }
    }

    /// The most recently recorded gameweek, or 0 before the first.
    pub fn last_gameweek(&self) -> u32 {
        self.history.last().map(|r| r.gameweek).unwrap_or(0)
    }

    pub fn next_gameweek(&self) -> u32 {
        self.last_gameweek() + 1
    }

    /// Whether the manager may record `gameweek` next. Gaps are allowed
    /// (a manager who joins late skips earlier rounds).
    pub fn can_record(&self, gameweek: u32) -> bool {
        gameweek > self.last_gameweek()
    }

    /// Append a result and add it to the running total.
    pub fn record(&mut self, result: GameweekResult) -> Result<(), HistoryError> {
        if !self.can_record(result.gameweek) {
            return Err(HistoryError::OutOfOrder {
                gameweek: result.gameweek,
                last: self.last_gameweek(),
            });
        }
        self.total_points += i64::from(result.total_points);
        self.history.push(result);
        Ok(())
    }

    /// Score the current squad for `gameweek` without recording it.
    pub fn score_gameweek<S: StatSource + ?Sized>(&self, gameweek: u32, source: &mut S) -> GameweekResult {
        simulate_gameweek(&self.squad.squad, &self.squad.bench, gameweek, source)
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub manager_id: String,
    pub name: String,
    pub total_points: i64,
    pub gameweeks_played: usize,
    /// Points from the most recent recorded gameweek, if any.
    pub last_gameweek_points: Option<i32>,
}

/// Rank managers by total points, best first.
///
/// Ties share a rank and the next rank skips (1, 1, 3). Tied managers are
/// listed by name, then id.
pub fn rank_managers(managers: &[Manager]) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&Manager> = managers.iter().collect();
    sorted.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(sorted.len());
    for (idx, m) in sorted.iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.total_points == m.total_points => prev.rank,
            _ => idx + 1,
        };
        entries.push(LeaderboardEntry {
            rank,
            manager_id: m.id.clone(),
            name: m.name.clone(),
            total_points: m.total_points,
            gameweeks_played: m.history.len(),
            last_gameweek_points: m.history.last().map(|r| r.total_points),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn result(gameweek: u32, points: i32) -> GameweekResult {
        GameweekResult {
            gameweek,
            total_points: points,
            squad_points: points,
            bench_points: 0,
            player_stats: BTreeMap::new(),
            date: Utc::now(),
        }
    }

    fn manager_with(id: &str, name: &str, totals: &[i32]) -> Manager {
        let mut m = Manager::new(id, name, 100);
        for (i, &pts) in totals.iter().enumerate() {
            m.record(result(i as u32 + 1, pts)).unwrap();
        }
        m
    }

    #[test]
    fn record_accumulates_total() {
        let m = manager_with("m1", "Ada", &[40, -3, 55]);
        assert_eq!(m.total_points, 92);
        assert_eq!(m.history.len(), 3);
        assert_eq!(m.last_gameweek(), 3);
        assert_eq!(m.next_gameweek(), 4);
    }

    #[test]
    fn record_rejects_repeat_and_earlier_gameweeks() {
        let mut m = manager_with("m1", "Ada", &[10, 20]);
        assert_eq!(
            m.record(result(2, 99)),
            Err(HistoryError::OutOfOrder { gameweek: 2, last: 2 })
        );
        assert_eq!(
            m.record(result(1, 99)),
            Err(HistoryError::OutOfOrder { gameweek: 1, last: 2 })
        );
        assert_eq!(m.total_points, 30);
        assert_eq!(m.history.len(), 2);
    }

    #[test]
    fn record_allows_gaps() {
        let mut m = Manager::new("late", "Late Joiner", 100);
        m.record(result(5, 12)).unwrap();
        assert_eq!(m.last_gameweek(), 5);
    }

    #[test]
    fn ranking_shares_ranks_on_ties() {
        let managers = vec![
            manager_with("m1", "Cleo", &[50]),
            manager_with("m2", "Ada", &[70]),
            manager_with("m3", "Bea", &[50]),
            manager_with("m4", "Dan", &[10]),
        ];
        let board = rank_managers(&managers);
        let summary: Vec<(usize, &str, i64)> = board
            .iter()
            .map(|e| (e.rank, e.name.as_str(), e.total_points))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "Ada", 70), (2, "Bea", 50), (2, "Cleo", 50), (4, "Dan", 10)]
        );
        assert_eq!(board[0].last_gameweek_points, Some(70));
    }

    #[test]
    fn ranking_of_new_managers() {
        let managers = vec![Manager::new("a", "A", 1), Manager::new("b", "B", 1)];
        let board = rank_managers(&managers);
        assert!(board.iter().all(|e| e.rank == 1 && e.gameweeks_played == 0));
        assert_eq!(board[0].last_gameweek_points, None);
    }
}
