//! Team strength index
//!
//! Collapses a profile into a single scalar in [0.1, 1.0].

use crate::TeamProfile;

/// Lower bound of the strength index
pub const MIN_STRENGTH: f64 = 0.1;
/// Upper bound of the strength index
pub const MAX_STRENGTH: f64 = 1.0;
/// Strength reported for a team with no matches
pub const NO_DATA_STRENGTH: f64 = 0.5;

/// Weighted strength index for a team
pub fn team_strength(profile: &TeamProfile) -> f64 {
    let total = profile.total_matches();
    if total == 0 {
        return NO_DATA_STRENGTH;
    }
    let matches = total as f64;

    let win_rate = profile.wins as f64 / matches;
    let goal_diff = (profile.goals_for as f64 - profile.goals_against as f64) / matches;

    // 3 points per win, 1 per draw, out of a maximum of 15
    let form_score = profile.form.iter().map(|r| r.points()).sum::<u32>() as f64 / 15.0;

    let streak_bonus = (profile.win_streak as f64 * 0.05).min(0.15);
    let defensive_bonus = profile.clean_sheet_rate * 0.10;
    let recent_performance =
        profile.recent_goals_scored * 0.15 - profile.recent_goals_conceded * 0.10;
    let balance = (profile.attack_strength + profile.defense_strength) / 2.0;
    let position_bonus = 1.0 - profile.position.min(20) as f64 / 20.0;

    let strength = win_rate * 0.25
        + form_score * 0.20
        + (goal_diff + 2.0) / 4.0 * 0.15
        + streak_bonus
        + defensive_bonus
        + recent_performance * 0.10
        + balance * 0.10
        + position_bonus * 0.05;

    if strength.is_finite() {
        strength.clamp(MIN_STRENGTH, MAX_STRENGTH)
    } else {
        NO_DATA_STRENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticProfiles;
    use crate::{FormResult, Side};

    fn profile(form: [FormResult; 5]) -> TeamProfile {
        TeamProfile {
            name: "Test".to_string(),
            wins: 10,
            draws: 5,
            losses: 5,
            goals_for: 30,
            goals_against: 20,
            points: 35,
            form,
            position: 4,
            recent_goals_scored: 1.5,
            recent_goals_conceded: 1.0,
            win_streak: TeamProfile::leading_wins(&form),
            clean_sheet_rate: 0.3,
            days_rest: 5,
            points_per_game: 1.75,
            home_form_score: 0.6,
            away_form_score: 0.4,
            attack_strength: 0.6,
            defense_strength: 0.6,
        }
    }

    #[test]
    fn test_weighting() {
        use FormResult::*;
        let p = profile([Win, Draw, Loss, Win, Draw]);
        // 0.125 + 0.1067 + 0.0938 + 0.05 + 0.03 + 0.0125 + 0.06 + 0.04
        let expected = 0.5 * 0.25
            + (8.0 / 15.0) * 0.20
            + (0.5 + 2.0) / 4.0 * 0.15
            + 0.05
            + 0.03
            + (1.5 * 0.15 - 1.0 * 0.10) * 0.10
            + 0.6 * 0.10
            + (1.0 - 4.0 / 20.0) * 0.05;
        assert!((team_strength(&p) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_no_matches() {
        let mut p = profile([FormResult::Win; 5]);
        p.wins = 0;
        p.draws = 0;
        p.losses = 0;
        assert_eq!(team_strength(&p), NO_DATA_STRENGTH);
    }

    #[test]
    fn test_clamped_to_range() {
        let mut strong = profile([FormResult::Win; 5]);
        strong.wins = 20;
        strong.draws = 0;
        strong.losses = 0;
        strong.goals_for = 120;
        strong.goals_against = 0;
        strong.position = 1;
        strong.recent_goals_scored = 5.0;
        assert_eq!(team_strength(&strong), MAX_STRENGTH);

        let mut weak = profile([FormResult::Loss; 5]);
        weak.wins = 0;
        weak.draws = 0;
        weak.losses = 20;
        weak.goals_for = 0;
        weak.goals_against = 100;
        weak.position = 18;
        weak.recent_goals_scored = 0.0;
        weak.recent_goals_conceded = 3.0;
        weak.attack_strength = 0.0;
        weak.defense_strength = 0.0;
        weak.clean_sheet_rate = 0.0;
        assert_eq!(team_strength(&weak), MIN_STRENGTH);
    }

    #[test]
    fn test_generated_profiles_in_range() {
        for i in 0..300 {
            let name = format!("Team {}", i);
            for side in [Side::Home, Side::Away] {
                let s = team_strength(&SyntheticProfiles::generate(&name, side));
                assert!((MIN_STRENGTH..=MAX_STRENGTH).contains(&s), "{}: {}", name, s);
            }
        }
    }
}
