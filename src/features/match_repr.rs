//! Match feature representation for classifier input
//!
//! One side's view of a fixture, encoded as a fixed 14-slot vector. Slot order is
//! part of the model contract: the classifier is trained and queried with it.

use serde::{Deserialize, Serialize};

use super::strength::team_strength;
use crate::{MatchContext, Side};

/// Home advantage constant applied to the home side
pub const HOME_ADVANTAGE: f32 = 0.15;
/// Head-to-head ratio used when the teams have never met
pub const NO_HEAD_TO_HEAD: f32 = 0.33;

/// Features of one side of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchFeatures {
    /// Strength index of this side
    pub strength: f32,
    /// Strength index of the opponent
    pub opponent_strength: f32,
    /// W=1, D=0.5, L=0 averaged over the form window
    pub form: f32,
    /// Goal difference per match / 3, clamped to [-1, 1]
    pub goal_diff: f32,
    /// Share of head-to-head meetings won by this side
    pub head_to_head: f32,
    /// 0.15 at home, 0 away
    pub home_advantage: f32,
    /// Recent scored minus conceded per match, clamped to [-2, 2]
    pub recent_goals_balance: f32,
    /// Leading wins / 5, capped at 1
    pub win_streak: f32,
    pub clean_sheet_rate: f32,
    /// Rest days difference / 7, clamped to [-1, 1]
    pub rest_advantage: f32,
    /// Venue form minus the other venue form, clamped to [-1, 1]
    pub venue_form_diff: f32,
    pub attack_strength: f32,
    pub defense_strength: f32,
    /// Points per game difference, clamped to [-0.5, 0.5]
    pub points_per_game_diff: f32,
}

impl MatchFeatures {
    /// Dimension of feature vector
    pub const DIM: usize = 14;

    /// Slot names, in vector order
    pub const NAMES: [&'static str; Self::DIM] = [
        "strength",
        "opponent_strength",
        "form",
        "goal_diff",
        "head_to_head",
        "home_advantage",
        "recent_goals_balance",
        "win_streak",
        "clean_sheet_rate",
        "rest_advantage",
        "venue_form_diff",
        "attack_strength",
        "defense_strength",
        "points_per_game_diff",
    ];

    /// Inclusive value range of each slot, in vector order
    pub const RANGES: [(f32, f32); Self::DIM] = [
        (0.1, 1.0),
        (0.1, 1.0),
        (0.0, 1.0),
        (-1.0, 1.0),
        (0.0, 1.0),
        (0.0, HOME_ADVANTAGE),
        (-2.0, 2.0),
        (0.0, 1.0),
        (0.0, 1.0),
        (-1.0, 1.0),
        (-1.0, 1.0),
        (0.0, 1.0),
        (0.0, 1.0),
        (-0.5, 0.5),
    ];

    /// Extract the features of one side of a fixture
    pub fn from_context(ctx: &MatchContext, side: Side) -> Self {
        let team = ctx.profile(side);
        let opponent = ctx.opponent(side);

        let form = team.form.iter().map(|r| r.form_value()).sum::<f64>() / team.form.len() as f64;

        let total = team.total_matches();
        let goal_diff = if total > 0 {
            (team.goals_for as f64 - team.goals_against as f64) / total as f64 / 3.0
        } else {
            0.0
        };

        let h2h_total = ctx.head_to_head.total();
        let head_to_head = if h2h_total > 0 {
            ctx.head_to_head.wins_for(side) as f32 / h2h_total as f32
        } else {
            NO_HEAD_TO_HEAD
        };

        let venue_form_diff = match side {
            Side::Home => team.home_form_score - team.away_form_score,
            Side::Away => team.away_form_score - team.home_form_score,
        };

        MatchFeatures {
            strength: team_strength(team) as f32,
            opponent_strength: team_strength(opponent) as f32,
            form: form as f32,
            goal_diff: clamp(goal_diff, 1.0),
            head_to_head,
            home_advantage: if side.is_home() { HOME_ADVANTAGE } else { 0.0 },
            recent_goals_balance: clamp(team.recent_goals_scored - team.recent_goals_conceded, 2.0),
            win_streak: (team.win_streak as f32 / 5.0).min(1.0),
            clean_sheet_rate: team.clean_sheet_rate as f32,
            rest_advantage: clamp((team.days_rest as f64 - opponent.days_rest as f64) / 7.0, 1.0),
            venue_form_diff: clamp(venue_form_diff, 1.0),
            attack_strength: team.attack_strength as f32,
            defense_strength: team.defense_strength as f32,
            points_per_game_diff: clamp(team.points_per_game - opponent.points_per_game, 0.5),
        }
    }

    /// Convert to a flat vector
    pub fn to_vec(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }

    pub fn to_array(&self) -> [f32; Self::DIM] {
        [
            self.strength,
            self.opponent_strength,
            self.form,
            self.goal_diff,
            self.head_to_head,
            self.home_advantage,
            self.recent_goals_balance,
            self.win_streak,
            self.clean_sheet_rate,
            self.rest_advantage,
            self.venue_form_diff,
            self.attack_strength,
            self.defense_strength,
            self.points_per_game_diff,
        ]
    }

    /// Create from a flat vector
    pub fn from_vec(v: &[f32]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        Some(MatchFeatures {
            strength: v[0],
            opponent_strength: v[1],
            form: v[2],
            goal_diff: v[3],
            head_to_head: v[4],
            home_advantage: v[5],
            recent_goals_balance: v[6],
            win_streak: v[7],
            clean_sheet_rate: v[8],
            rest_advantage: v[9],
            venue_form_diff: v[10],
            attack_strength: v[11],
            defense_strength: v[12],
            points_per_game_diff: v[13],
        })
    }

    /// Slot name paired with its value, in vector order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> {
        Self::NAMES.into_iter().zip(self.to_array())
    }
}

/// Symmetric clamp into [-limit, limit]; non-finite input maps to 0
fn clamp(x: f64, limit: f64) -> f32 {
    if x.is_finite() {
        x.clamp(-limit, limit) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ProfileSource, SyntheticProfiles};
    use crate::HeadToHead;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context(home: &str, away: &str, seed: u64) -> MatchContext {
        let mut rng = StdRng::seed_from_u64(seed);
        SyntheticProfiles::new().match_context(home, away, "Premier League", &mut rng)
    }

    fn assert_in_ranges(features: &MatchFeatures) {
        for ((name, value), (lo, hi)) in features.named().zip(MatchFeatures::RANGES) {
            assert!(
                value >= lo && value <= hi,
                "{} = {} outside [{}, {}]",
                name,
                value,
                lo,
                hi
            );
        }
    }

    #[test]
    fn test_slots_within_ranges() {
        for i in 0..100u64 {
            let ctx = context(&format!("Home {}", i), &format!("Away {}", i * 7), i);
            assert_in_ranges(&MatchFeatures::from_context(&ctx, Side::Home));
            assert_in_ranges(&MatchFeatures::from_context(&ctx, Side::Away));
        }
    }

    #[test]
    fn test_sides_are_symmetric() {
        let ctx = context("Arsenal", "Liverpool", 1);
        let home = MatchFeatures::from_context(&ctx, Side::Home);
        let away = MatchFeatures::from_context(&ctx, Side::Away);

        assert_eq!(home.strength, away.opponent_strength);
        assert_eq!(home.opponent_strength, away.strength);
        assert_eq!(home.home_advantage, HOME_ADVANTAGE);
        assert_eq!(away.home_advantage, 0.0);
        assert_eq!(home.rest_advantage, -away.rest_advantage);
        assert_eq!(home.points_per_game_diff, -away.points_per_game_diff);
    }

    #[test]
    fn test_head_to_head_ratio() {
        let mut ctx = context("Arsenal", "Liverpool", 2);
        ctx.head_to_head = HeadToHead {
            home_wins: 3,
            draws: 4,
            away_wins: 1,
        };
        assert_eq!(MatchFeatures::from_context(&ctx, Side::Home).head_to_head, 3.0 / 8.0);
        assert_eq!(MatchFeatures::from_context(&ctx, Side::Away).head_to_head, 1.0 / 8.0);

        ctx.head_to_head = HeadToHead::default();
        assert_eq!(
            MatchFeatures::from_context(&ctx, Side::Home).head_to_head,
            NO_HEAD_TO_HEAD
        );
    }

    #[test]
    fn test_zero_matches_goal_diff() {
        let mut ctx = context("Arsenal", "Liverpool", 3);
        ctx.home.wins = 0;
        ctx.home.draws = 0;
        ctx.home.losses = 0;
        let features = MatchFeatures::from_context(&ctx, Side::Home);
        assert_eq!(features.goal_diff, 0.0);
        assert_in_ranges(&features);
    }

    #[test]
    fn test_to_from_vec() {
        let ctx = context("Arsenal", "Liverpool", 4);
        let features = MatchFeatures::from_context(&ctx, Side::Home);

        let vec = features.to_vec();
        assert_eq!(vec.len(), MatchFeatures::DIM);
        assert_eq!(vec[5], HOME_ADVANTAGE);
        assert_eq!(MatchFeatures::from_vec(&vec), Some(features));
        assert_eq!(MatchFeatures::from_vec(&vec[..13]), None);
    }
}
