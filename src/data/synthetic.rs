//! Synthetic team statistics
//!
//! Stand-in for a real statistics provider. Every profile is derived from a hash
//! of the team name through a sine-based pseudo-random function, so the same name
//! always yields the same profile. Head-to-head records come from the request RNG.

use rand::rngs::StdRng;
use rand::Rng;

use crate::{FormResult, HeadToHead, MatchContext, Side, TeamProfile, FORM_LEN};

/// Provider of team profiles and head-to-head records
///
/// The synthetic generator is the only implementation today; a real data source
/// can replace it without touching feature extraction, training or inference.
pub trait ProfileSource {
    /// Profile for a team playing on the given side
    fn profile_for(&self, name: &str, side: Side) -> TeamProfile;

    /// Historical record between the two teams
    fn head_to_head(&self, home: &str, away: &str, rng: &mut StdRng) -> HeadToHead;

    /// Assemble the full context for a fixture
    fn match_context(&self, home: &str, away: &str, league: &str, rng: &mut StdRng) -> MatchContext {
        MatchContext {
            home: self.profile_for(home, Side::Home),
            away: self.profile_for(away, Side::Away),
            head_to_head: self.head_to_head(home, away, rng),
            league: league.to_string(),
        }
    }
}

/// Polynomial rolling hash (base 31) over UTF-16 code units, wrapping at i32
pub fn name_hash(name: &str) -> i32 {
    name.encode_utf16().fold(0i32, |hash, unit| {
        (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}

/// Deterministic value in [0, 1) for an integer seed: `frac(sin(seed) * 10000)`
pub fn prf(seed: i64) -> f64 {
    let x = (seed as f64).sin() * 10000.0;
    x - x.floor()
}

/// Name-seeded profile generator
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticProfiles;

impl SyntheticProfiles {
    pub fn new() -> Self {
        SyntheticProfiles
    }

    /// Generate the profile of a team from its name
    pub fn generate(name: &str, side: Side) -> TeamProfile {
        let hash = name_hash(name) as i64;
        let draw = |offset: i64| prf(hash + offset);

        let total = 20 + (draw(0) * 18.0).floor() as u32;
        let wins = (draw(1) * total as f64 * 0.6).floor() as u32;
        let losses = (draw(2) * (total - wins) as f64 * 0.6).floor() as u32;
        let draws = total - wins - losses;

        let goals_for = wins * 2 + draws + (draw(3) * wins as f64).floor() as u32;
        let goals_against = losses * 2 + draws + (draw(4) * losses as f64).floor() as u32;
        let points = wins * 3 + draws;

        let mut form = [FormResult::Loss; FORM_LEN];
        for (i, slot) in form.iter_mut().enumerate() {
            let idx = (draw(5 + i as i64) * FormResult::ALL.len() as f64).floor() as usize;
            *slot = FormResult::ALL[idx.min(FormResult::ALL.len() - 1)];
        }

        // Re-bias every slot toward the season win rate (home teams get a nudge)
        let win_bias = if side.is_home() { 0.1 } else { 0.0 };
        let form_weight = wins as f64 / total as f64 + win_bias;
        for (i, slot) in form.iter_mut().enumerate() {
            *slot = if draw(10 + i as i64) < form_weight {
                FormResult::Win
            } else if draw(20 + i as i64) < 0.3 {
                FormResult::Draw
            } else {
                FormResult::Loss
            };
        }

        let count = |r: FormResult| form.iter().filter(|f| **f == r).count() as f64;
        let (recent_w, recent_d, recent_l) = (
            count(FormResult::Win),
            count(FormResult::Draw),
            count(FormResult::Loss),
        );
        let recent_scored = recent_w * 2.2 + recent_d * 1.1 + recent_l * 0.6;
        let recent_conceded = recent_w * 0.7 + recent_d * 1.1 + recent_l * 2.1;

        let matches = total as f64;
        let clean_sheets = (wins as f64 * 0.5 + draws as f64 * 0.3).floor();
        let days_rest = TeamProfile::MIN_DAYS_REST + (draw(30) * 5.0).floor() as u32;

        let (home_wins, away_wins) = if side.is_home() {
            (wins, (wins as f64 * 0.4).floor() as u32)
        } else {
            ((wins as f64 * 0.6).floor() as u32, wins)
        };
        let half_season = (matches / 2.0).max(1.0);

        TeamProfile {
            name: name.to_string(),
            wins,
            draws,
            losses,
            goals_for,
            goals_against,
            points,
            form,
            position: (draw(6) * 18.0).floor() as u32 + 1,
            recent_goals_scored: recent_scored / FORM_LEN as f64,
            recent_goals_conceded: recent_conceded / FORM_LEN as f64,
            win_streak: TeamProfile::leading_wins(&form),
            clean_sheet_rate: clean_sheets / matches,
            days_rest,
            points_per_game: points as f64 / matches,
            home_form_score: (home_wins as f64 / half_season).min(1.0),
            away_form_score: (away_wins as f64 / half_season).min(1.0),
            attack_strength: (goals_for as f64 / matches / 2.5).min(1.0),
            defense_strength: (1.0 - goals_against as f64 / matches / 2.5).max(0.0),
        }
        .clamped()
    }
}

impl ProfileSource for SyntheticProfiles {
    fn profile_for(&self, name: &str, side: Side) -> TeamProfile {
        let profile = Self::generate(name, side);
        log::debug!(
            "Profile {} ({}): {}W-{}D-{}L, form {}, position {}",
            profile.name,
            side,
            profile.wins,
            profile.draws,
            profile.losses,
            profile.form_string(),
            profile.position
        );
        profile
    }

    fn head_to_head(&self, _home: &str, _away: &str, rng: &mut StdRng) -> HeadToHead {
        let total: u32 = rng.gen_range(5..=12);
        let half = total as f64 * 0.5;
        let home_wins = (rng.gen::<f64>() * half).floor() as u32;
        let away_wins = (rng.gen::<f64>() * half).floor() as u32;

        HeadToHead {
            home_wins,
            draws: total - home_wins - away_wins,
            away_wins,
        }
    }
}
