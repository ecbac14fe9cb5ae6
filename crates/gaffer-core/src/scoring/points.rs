// Fantasy points calculation from a single match's statistics.
//
// Pure and deterministic. Inputs are trusted: clean sheet and goals conceded
// are scored independently even when they disagree.

use serde::{Deserialize, Serialize};

use crate::player::Position;

// ---------------------------------------------------------------------------
// Scoring constants
// ---------------------------------------------------------------------------

/// Minutes needed for the full appearance bonus and a clean sheet.
pub const FULL_APPEARANCE_MINUTES: u16 = 60;

const POINTS_PER_ASSIST: i32 = 3;
const SAVES_PER_POINT: u8 = 3;
const POINTS_PER_PENALTY_SAVE: i32 = 5;
const GOALS_CONCEDED_PER_PENALTY: u8 = 2;
const YELLOW_CARD_POINTS: i32 = -1;
const RED_CARD_POINTS: i32 = -3;
const OWN_GOAL_POINTS: i32 = -2;

fn goal_points(position: Position) -> i32 {
    match position {
        Position::Goalkeeper | Position::Defender => 6,
        Position::Midfielder => 5,
        Position::Attacker => 4,
    }
}

fn clean_sheet_points(position: Position) -> i32 {
    match position {
        Position::Goalkeeper | Position::Defender => 4,
        Position::Midfielder => 1,
        Position::Attacker => 0,
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One player's statistics for one gameweek.
///
/// Counts are unsigned so a negative count cannot reach the calculator;
/// provider data goes through [`super::stats::ProviderStatLine`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub minutes_played: u16,
    pub goals: u8,
    pub assists: u8,
    pub clean_sheet: bool,
    pub saves: u8,
    pub penalties_saved: u8,
    pub yellow_cards: u8,
    pub red_cards: u8,
    pub own_goals: u8,
    pub goals_conceded: u8,
}

/// Itemized fantasy points. `total` is the sum of every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsBreakdown {
    pub minutes: i32,
    pub goals: i32,
    pub assists: i32,
    pub clean_sheet: i32,
    pub saves: i32,
    pub penalties_saved: i32,
    pub cards: i32,
    pub own_goals: i32,
    pub conceded: i32,
    pub total: i32,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Score a player's match.
///
/// A player who did not play scores zero in every component, whatever the
/// other fields say.
pub fn calculate_points(stats: &MatchStats, position: Position) -> PointsBreakdown {
    if stats.minutes_played == 0 {
        return PointsBreakdown::default();
    }

    let full_appearance = stats.minutes_played >= FULL_APPEARANCE_MINUTES;
    let is_goalkeeper = position == Position::Goalkeeper;
    let concedes_penalty = matches!(position, Position::Goalkeeper | Position::Defender);

    let minutes = if full_appearance { 2 } else { 1 };
    let goals = i32::from(stats.goals) * goal_points(position);
    let assists = i32::from(stats.assists) * POINTS_PER_ASSIST;

    let clean_sheet = if full_appearance && stats.clean_sheet {
        clean_sheet_points(position)
    } else {
        0
    };

    let (saves, penalties_saved) = if is_goalkeeper {
        (
            i32::from(stats.saves / SAVES_PER_POINT),
            i32::from(stats.penalties_saved) * POINTS_PER_PENALTY_SAVE,
        )
    } else {
        (0, 0)
    };

    let cards = i32::from(stats.yellow_cards) * YELLOW_CARD_POINTS
        + i32::from(stats.red_cards) * RED_CARD_POINTS;
    let own_goals = i32::from(stats.own_goals) * OWN_GOAL_POINTS;

    let conceded = if concedes_penalty && stats.goals_conceded >= GOALS_CONCEDED_PER_PENALTY {
        -i32::from(stats.goals_conceded / GOALS_CONCEDED_PER_PENALTY)
    } else {
        0
    };

    let total = minutes
        + goals
        + assists
        + clean_sheet
        + saves
        + penalties_saved
        + cards
        + own_goals
        + conceded;

    PointsBreakdown {
        minutes,
        goals,
        assists,
        clean_sheet,
        saves,
        penalties_saved,
        cards,
        own_goals,
        conceded,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(minutes: u16) -> MatchStats {
        MatchStats {
            minutes_played: minutes,
            ..MatchStats::default()
        }
    }

    // -- Minutes --

    #[test]
    fn zero_minutes_zeroes_everything() {
        let stats = MatchStats {
            minutes_played: 0,
            goals: 3,
            assists: 2,
            clean_sheet: true,
            saves: 9,
            penalties_saved: 1,
            yellow_cards: 1,
            red_cards: 1,
            own_goals: 1,
            goals_conceded: 4,
        };
        for pos in Position::ALL {
            assert_eq!(calculate_points(&stats, pos), PointsBreakdown::default());
        }
    }

    #[test]
    fn appearance_points_by_minutes() {
        assert_eq!(calculate_points(&played(1), Position::Midfielder).minutes, 1);
        assert_eq!(calculate_points(&played(59), Position::Midfielder).minutes, 1);
        assert_eq!(calculate_points(&played(60), Position::Midfielder).minutes, 2);
        assert_eq!(calculate_points(&played(95), Position::Midfielder).minutes, 2);
    }

    // -- Goals and assists --

    #[test]
    fn single_goal_scores_position_multiplier() {
        let expected = [
            (Position::Goalkeeper, 6),
            (Position::Defender, 6),
            (Position::Midfielder, 5),
            (Position::Attacker, 4),
        ];
        for (pos, multiplier) in expected {
            let stats = MatchStats {
                goals: 1,
                ..played(90)
            };
            let b = calculate_points(&stats, pos);
            assert_eq!(b.goals, multiplier, "{pos}");
            // Only the appearance bonus sits on top of the goal.
            assert_eq!(b.total, multiplier + 2, "{pos}");
        }
    }

    #[test]
    fn assists_are_three_points_for_everyone() {
        for pos in Position::ALL {
            let stats = MatchStats {
                assists: 2,
                ..played(90)
            };
            assert_eq!(calculate_points(&stats, pos).assists, 6);
        }
    }

    // -- Clean sheets --

    #[test]
    fn clean_sheet_by_position() {
        let stats = MatchStats {
            clean_sheet: true,
            ..played(90)
        };
        assert_eq!(calculate_points(&stats, Position::Goalkeeper).clean_sheet, 4);
        assert_eq!(calculate_points(&stats, Position::Defender).clean_sheet, 4);
        assert_eq!(calculate_points(&stats, Position::Midfielder).clean_sheet, 1);
        assert_eq!(calculate_points(&stats, Position::Attacker).clean_sheet, 0);
    }

    #[test]
    fn clean_sheet_needs_sixty_minutes_and_flag() {
        let short = MatchStats {
            clean_sheet: true,
            ..played(59)
        };
        assert_eq!(calculate_points(&short, Position::Defender).clean_sheet, 0);

        let no_flag = played(90);
        assert_eq!(calculate_points(&no_flag, Position::Defender).clean_sheet, 0);

        let benched = MatchStats {
            clean_sheet: true,
            ..played(0)
        };
        assert_eq!(calculate_points(&benched, Position::Defender).clean_sheet, 0);
    }

    #[test]
    fn clean_sheet_not_cross_checked_against_goals_conceded() {
        let stats = MatchStats {
            clean_sheet: true,
            goals_conceded: 1,
            ..played(90)
        };
        let b = calculate_points(&stats, Position::Defender);
        assert_eq!(b.clean_sheet, 4);
        assert_eq!(b.conceded, 0);
    }

    // -- Goalkeeper-only components --

    #[test]
    fn saves_bonus_is_floor_of_thirds() {
        for (saves, expected) in [(0, 0), (2, 0), (3, 1), (5, 1), (6, 2), (10, 3)] {
            let stats = MatchStats {
                saves,
                ..played(90)
            };
            assert_eq!(
                calculate_points(&stats, Position::Goalkeeper).saves,
                expected,
                "saves={saves}"
            );
        }
    }

    #[test]
    fn saves_and_penalty_saves_ignored_for_outfield() {
        let stats = MatchStats {
            saves: 6,
            penalties_saved: 1,
            ..played(90)
        };
        let b = calculate_points(&stats, Position::Defender);
        assert_eq!(b.saves, 0);
        assert_eq!(b.penalties_saved, 0);
    }

    #[test]
    fn penalty_save_is_five_points() {
        let stats = MatchStats {
            penalties_saved: 2,
            ..played(90)
        };
        assert_eq!(calculate_points(&stats, Position::Goalkeeper).penalties_saved, 10);
    }

    // -- Penalties --

    #[test]
    fn goals_conceded_penalty_for_goalkeepers_and_defenders() {
        for (conceded, expected) in [(0, 0), (1, 0), (2, -1), (3, -1), (4, -2), (5, -2)] {
            let stats = MatchStats {
                goals_conceded: conceded,
                ..played(90)
            };
            assert_eq!(calculate_points(&stats, Position::Goalkeeper).conceded, expected);
            assert_eq!(calculate_points(&stats, Position::Defender).conceded, expected);
            assert_eq!(calculate_points(&stats, Position::Midfielder).conceded, 0);
            assert_eq!(calculate_points(&stats, Position::Attacker).conceded, 0);
        }
    }

    #[test]
    fn cards_and_own_goals() {
        let stats = MatchStats {
            yellow_cards: 1,
            red_cards: 1,
            own_goals: 2,
            ..played(90)
        };
        let b = calculate_points(&stats, Position::Attacker);
        assert_eq!(b.cards, -4);
        assert_eq!(b.own_goals, -4);
        assert_eq!(b.total, 2 - 4 - 4);
    }

    #[test]
    fn total_can_go_negative() {
        let stats = MatchStats {
            red_cards: 1,
            own_goals: 1,
            goals_conceded: 4,
            ..played(30)
        };
        let b = calculate_points(&stats, Position::Defender);
        assert_eq!(b.total, 1 - 3 - 2 - 2);
    }

    #[test]
    fn total_is_sum_of_components() {
        let stats = MatchStats {
            minutes_played: 90,
            goals: 1,
            assists: 1,
            clean_sheet: true,
            saves: 7,
            penalties_saved: 1,
            yellow_cards: 1,
            red_cards: 0,
            own_goals: 0,
            goals_conceded: 0,
        };
        let b = calculate_points(&stats, Position::Goalkeeper);
        let sum = b.minutes
            + b.goals
            + b.assists
            + b.clean_sheet
            + b.saves
            + b.penalties_saved
            + b.cards
            + b.own_goals
            + b.conceded;
        assert_eq!(b.total, sum);
        assert_eq!(b.total, 2 + 6 + 3 + 4 + 2 + 5 - 1);
    }

    #[test]
    fn stats_serialize_in_camel_case() {
        let json = serde_json::to_value(played(45)).unwrap();
        assert_eq!(json["minutesPlayed"], 45);
        assert_eq!(json["goalsConceded"], 0);
        assert_eq!(json["cleanSheet"], false);
    }
}
