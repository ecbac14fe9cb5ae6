// Team chemistry: pairwise links between squad members who share a club,
// nationality, or position.

use serde::Serialize;

use crate::player::{Player, Position};

const SAME_CLUB: u32 = 5;
const SAME_NATIONALITY: u32 = 3;
const SAME_POSITION: u32 = 1;
const MAX_PAIR_CHEMISTRY: u32 = SAME_CLUB + SAME_NATIONALITY + SAME_POSITION;

/// The fields chemistry is computed from.
pub trait ChemistryProfile {
    fn club(&self) -> &str;
    fn nationality(&self) -> &str;
    fn position(&self) -> Position;
}

impl ChemistryProfile for Player {
    fn club(&self) -> &str {
        &self.club
    }

    fn nationality(&self) -> &str {
        &self.nationality
    }

    fn position(&self) -> Position {
        self.position
    }
}

/// Chemistry grade bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChemistryGrade {
    Excellent,
    Good,
    Average,
    Poor,
}

impl ChemistryGrade {
    /// Grade for a percentage in 0-100.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 75.0 {
            ChemistryGrade::Excellent
        } else if percentage >= 50.0 {
            ChemistryGrade::Good
        } else if percentage >= 25.0 {
            ChemistryGrade::Average
        } else {
            ChemistryGrade::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChemistryGrade::Excellent => "Excellent",
            ChemistryGrade::Good => "Good",
            ChemistryGrade::Average => "Average",
            ChemistryGrade::Poor => "Poor",
        }
    }

    /// Display color (hex) for the grade.
    pub fn color(&self) -> &'static str {
        match self {
            ChemistryGrade::Excellent => "#22c55e",
            ChemistryGrade::Good => "#3b82f6",
            ChemistryGrade::Average => "#eab308",
            ChemistryGrade::Poor => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemistryReport {
    pub total_chemistry: u32,
    pub max_possible_chemistry: u32,
    pub percentage: f64,
    pub grade: ChemistryGrade,
    pub color: &'static str,
}

fn pair_chemistry<P: ChemistryProfile>(a: &P, b: &P) -> u32 {
    let mut score = 0;
    if a.club() == b.club() {
        score += SAME_CLUB;
    }
    if a.nationality() == b.nationality() {
        score += SAME_NATIONALITY;
    }
    if a.position() == b.position() {
        score += SAME_POSITION;
    }
    score
}

/// Score every unordered pair in the squad.
pub fn compute_chemistry<P: ChemistryProfile>(squad: &[P]) -> ChemistryReport {
    let mut total = 0;
    for (i, a) in squad.iter().enumerate() {
        for b in &squad[i + 1..] {
            total += pair_chemistry(a, b);
        }
    }

    let n = squad.len() as u32;
    let pair_count = n * n.saturating_sub(1) / 2;
    let max_possible = pair_count * MAX_PAIR_CHEMISTRY;
    let percentage = if max_possible == 0 {
        0.0
    } else {
        100.0 * f64::from(total) / f64::from(max_possible)
    };
    let grade = ChemistryGrade::from_percentage(percentage);

    ChemistryReport {
        total_chemistry: total,
        max_possible_chemistry: max_possible,
        percentage,
        grade,
        color: grade.color(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Member {
        club: &'static str,
        nationality: &'static str,
        position: Position,
    }

    impl ChemistryProfile for Member {
        fn club(&self) -> &str {
            self.club
        }
        fn nationality(&self) -> &str {
            self.nationality
        }
        fn position(&self) -> Position {
            self.position
        }
    }

    fn m(club: &'static str, nationality: &'static str, position: Position) -> Member {
        Member {
            club,
            nationality,
            position,
        }
    }

    #[test]
    fn empty_and_single_squads_are_poor() {
        let empty: Vec<Member> = vec![];
        let r = compute_chemistry(&empty);
        assert_eq!(r.percentage, 0.0);
        assert_eq!(r.max_possible_chemistry, 0);
        assert_eq!(r.grade, ChemistryGrade::Poor);

        let one = vec![m("A", "X", Position::Defender)];
        let r = compute_chemistry(&one);
        assert_eq!(r.percentage, 0.0);
        assert_eq!(r.grade, ChemistryGrade::Poor);
        assert_eq!(r.color, ChemistryGrade::Poor.color());
    }

    #[test]
    fn identical_squad_is_perfect() {
        let squad: Vec<Member> = (0..11).map(|_| m("A", "X", Position::Midfielder)).collect();
        let r = compute_chemistry(&squad);
        assert_eq!(r.max_possible_chemistry, 55 * 9);
        assert_eq!(r.total_chemistry, 55 * 9);
        assert_eq!(r.percentage, 100.0);
        assert_eq!(r.grade, ChemistryGrade::Excellent);
        assert_eq!(r.color, "#22c55e");
    }

    #[test]
    fn links_are_additive_per_pair() {
        let squad = vec![
            m("A", "X", Position::Defender),
            m("A", "Y", Position::Defender),
            m("B", "X", Position::Attacker),
        ];
        // (0,1): club + position = 6; (0,2): nationality = 3; (1,2): none.
        let r = compute_chemistry(&squad);
        assert_eq!(r.total_chemistry, 9);
        assert_eq!(r.max_possible_chemistry, 27);
        assert!((r.percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(r.grade, ChemistryGrade::Average);
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(ChemistryGrade::from_percentage(75.0), ChemistryGrade::Excellent);
        assert_eq!(ChemistryGrade::from_percentage(74.9), ChemistryGrade::Good);
        assert_eq!(ChemistryGrade::from_percentage(50.0), ChemistryGrade::Good);
        assert_eq!(ChemistryGrade::from_percentage(49.9), ChemistryGrade::Average);
        assert_eq!(ChemistryGrade::from_percentage(25.0), ChemistryGrade::Average);
        assert_eq!(ChemistryGrade::from_percentage(24.9), ChemistryGrade::Poor);
    }

    #[test]
    fn works_on_players() {
        use crate::player::Attributes;
        let a = Player::with_derived_rating(1, "A", Position::Goalkeeper, "Club", "Nation", Attributes::default(), 1);
        let b = Player::with_derived_rating(2, "B", Position::Defender, "Club", "Nation", Attributes::default(), 1);
        let r = compute_chemistry(&[a, b]);
        assert_eq!(r.total_chemistry, 8);
        assert_eq!(r.grade, ChemistryGrade::Excellent);
    }
}
