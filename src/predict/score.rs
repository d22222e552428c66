//! Scoreline sampling
//!
//! Goals for each side are drawn independently from a Poisson distribution whose
//! rate grows with the side's strength index and its predicted win percentage.

use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use crate::Probabilities;

/// Bounds of the Poisson rate
pub const MIN_LAMBDA: f64 = 0.1;
pub const MAX_LAMBDA: f64 = 4.0;
/// Goals per unit of scoring input
pub const LAMBDA_SCALE: f64 = 2.8;
/// Iteration cap of the Knuth sampler (at most this many goals minus one)
pub const MAX_ITERATIONS: u32 = 10;
/// Divisor turning a win percentage into a scoring-input bonus
pub const WIN_PCT_DIVISOR: f64 = 150.0;

/// Draw a goal count for a strength-like scalar
///
/// Non-positive (or NaN) input always scores 0.
pub fn generate_score(x: f64, rng: &mut StdRng) -> u32 {
    if !(x > 0.0) {
        return 0;
    }

    let lambda = (x * LAMBDA_SCALE).clamp(MIN_LAMBDA, MAX_LAMBDA);
    let limit = (-lambda).exp();

    // Knuth: multiply uniforms until the product drops below e^-lambda
    let mut k = 0;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen::<f64>();
        if p <= limit || k >= MAX_ITERATIONS {
            break;
        }
    }
    k - 1
}

/// Predicted final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scoreline {
    pub home: u32,
    pub away: u32,
}

impl fmt::Display for Scoreline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Samples a scoreline from strengths and predicted win percentages
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreSampler;

impl ScoreSampler {
    pub fn new() -> Self {
        ScoreSampler
    }

    /// Scoring input for one side
    pub fn scoring_input(strength: f64, win_pct: u8) -> f64 {
        strength + win_pct as f64 / WIN_PCT_DIVISOR
    }

    pub fn sample(
        &self,
        home_strength: f64,
        away_strength: f64,
        probabilities: &Probabilities,
        rng: &mut StdRng,
    ) -> Scoreline {
        let home = generate_score(Self::scoring_input(home_strength, probabilities.home), rng);
        let away = generate_score(Self::scoring_input(away_strength, probabilities.away), rng);
        Scoreline { home, away }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_non_positive_input_scores_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for x in [0.0, -0.01, -1.0, -100.0, f64::NAN] {
            for _ in 0..100 {
                assert_eq!(generate_score(x, &mut rng), 0);
            }
        }
    }

    #[test]
    fn test_goal_count_capped() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..5000 {
            assert!(generate_score(10.0, &mut rng) < MAX_ITERATIONS);
        }
    }

    #[test]
    fn test_large_input_mean_near_four() {
        let mut rng = StdRng::seed_from_u64(3);
        let draws = 20_000;
        let total: u32 = (0..draws).map(|_| generate_score(1.5, &mut rng)).sum();
        let mean = total as f64 / draws as f64;
        // The iteration cap trims the upper tail slightly below 4
        assert!((3.7..4.2).contains(&mean), "mean = {}", mean);
    }

    #[test]
    fn test_stronger_side_scores_more_on_average() {
        let mut rng = StdRng::seed_from_u64(4);
        let weak: u32 = (0..5000).map(|_| generate_score(0.2, &mut rng)).sum();
        let strong: u32 = (0..5000).map(|_| generate_score(1.0, &mut rng)).sum();
        assert!(strong > weak);
    }

    #[test]
    fn test_scoreline_format() {
        let score = Scoreline { home: 2, away: 1 };
        assert_eq!(score.to_string(), "2-1");

        let mut rng = StdRng::seed_from_u64(5);
        let probs = Probabilities {
            home: 55,
            draw: 30,
            away: 15,
        };
        let text = ScoreSampler::new().sample(0.7, 0.5, &probs, &mut rng).to_string();
        let (home, away) = text.split_once('-').expect("separator");
        assert!(home.parse::<u32>().is_ok() && away.parse::<u32>().is_ok());
    }

    #[test]
    fn test_scoring_input() {
        assert!((ScoreSampler::scoring_input(0.6, 75) - 1.1).abs() < 1e-12);
    }
}
