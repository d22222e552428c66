//! Prediction result assembly
//!
//! Turns the classifier output, sampled score, and both profiles into the
//! user-facing [`PredictionData`].

use crate::features::team_strength;
use crate::predict::inference::OutcomeProbabilities;
use crate::predict::score::Scoreline;
use crate::{Config, MatchContext, ModelKind, PredictionData, Source, TeamProfile};

/// Everything the assembler needs from one finished request
pub struct PredictionInputs<'a> {
    pub context: &'a MatchContext,
    pub probabilities: &'a OutcomeProbabilities,
    pub score: Scoreline,
    pub train_accuracy: f64,
    pub val_accuracy: f64,
    pub epochs_completed: usize,
    /// False when fitting failed and the classifier kept best-effort weights
    pub trained: bool,
}

/// Builds analysis text, key factors, and sources
#[derive(Debug, Clone)]
pub struct PredictionAssembler {
    config: Config,
}

impl PredictionAssembler {
    pub fn new(config: &Config) -> Self {
        PredictionAssembler {
            config: config.clone(),
        }
    }

    pub fn assemble(&self, inputs: &PredictionInputs<'_>) -> PredictionData {
        let ctx = inputs.context;
        PredictionData {
            home_team: ctx.home.name.clone(),
            away_team: ctx.away.name.clone(),
            league: ctx.league.clone(),
            probabilities: inputs.probabilities.percentages(),
            predicted_score: inputs.score.to_string(),
            analysis: self.analysis(inputs),
            key_factors: self.key_factors(inputs),
            sources: sources(ctx),
            model_used: ModelKind::NeuralNet,
        }
    }

    fn architecture(&self) -> String {
        let [h1, h2, h3, h4] = self.config.model.hidden_dims;
        format!("14 → {} → {} → {} → {} → 3", h1, h2, h3, h4)
    }

    fn analysis(&self, inputs: &PredictionInputs<'_>) -> String {
        let ctx = inputs.context;
        let t = &self.config.training;
        let [h1, h2, h3, h4] = self.config.model.hidden_dims;
        let [d1, d2, d3] = self.config.model.dropout;

        let mut out = format!(
            r#"Neural network match analysis

Model architecture:
  Input: 14 match features
  Layer 1: Dense({}) + BatchNorm + Dropout({})
  Layer 2: Dense({}) + BatchNorm + Dropout({})
  Layer 3: Dense({}) + Dropout({})
  Layer 4: Dense({}) + ReLU
  Output: Softmax(3 classes)
  Training: {} samples, {} of {} epochs completed
  Accuracy: {:.1}% training, {:.1}% validation
  Optimizer: Adam (lr={}, β1={}, β2={})
  Regularization: L2 + Dropout + BatchNorm
"#,
            h1,
            d1,
            h2,
            d2,
            h3,
            d3,
            h4,
            t.samples,
            inputs.epochs_completed,
            t.epochs,
            inputs.train_accuracy * 100.0,
            inputs.val_accuracy * 100.0,
            t.learning_rate,
            t.beta_1,
            t.beta_2
        );
        if !inputs.trained {
            out.push_str("  Warning: training failed, prediction uses best-effort weights\n");
        }
        out.push_str(&format!(
            "  Most likely outcome: {}\n\n",
            inputs.probabilities.most_likely()
        ));

        out.push_str(&team_section(&ctx.home, "Home"));
        out.push_str(&team_section(&ctx.away, "Away"));

        let h2h = &ctx.head_to_head;
        out.push_str(&format!(
            r#"Key insights:
  Head-to-head: {}W-{}D-{}L
  Home form: {:.0}% home win rate
  Away form: {:.0}% away win rate
  Rest days: Home {}d | Away {}d"#,
            h2h.home_wins,
            h2h.draws,
            h2h.away_wins,
            ctx.home.home_form_score * 100.0,
            ctx.away.away_form_score * 100.0,
            ctx.home.days_rest,
            ctx.away.days_rest
        ));
        out
    }

    fn key_factors(&self, inputs: &PredictionInputs<'_>) -> Vec<String> {
        let ctx = inputs.context;
        let (home, away) = (&ctx.home, &ctx.away);
        let pct = inputs.probabilities.percentages();
        let raw = inputs.probabilities.raw;

        vec![
            format!(
                "{} win: {}% (activation: {:.3})",
                home.name, pct.home, raw[0]
            ),
            format!(
                "{} win: {}% (activation: {:.3})",
                away.name, pct.away, raw[2]
            ),
            format!(
                "Recent form: {} vs {} wins (last 5)",
                home.form_wins(),
                away.form_wins()
            ),
            format!(
                "Attack power: {:.0}% vs {:.0}%",
                home.attack_strength * 100.0,
                away.attack_strength * 100.0
            ),
            format!(
                "Defense quality: {:.0}% vs {:.0}%",
                home.defense_strength * 100.0,
                away.defense_strength * 100.0
            ),
            format!("Home advantage: +15% boost applied to {}", home.name),
            format!(
                "Model: {}, 4 hidden layers, {} training samples",
                self.architecture(),
                self.config.training.samples
            ),
            format!("Validation accuracy: {:.1}%", inputs.val_accuracy * 100.0),
            format!(
                "Optimizer: Adam with learning rate {}",
                self.config.training.learning_rate
            ),
            "Regularization: L2 + Dropout + Batch Normalization".to_string(),
        ]
    }
}

fn team_section(team: &TeamProfile, venue: &str) -> String {
    format!(
        r#"{} ({}):
  Overall: {}W-{}D-{}L ({:.1}% win rate)
  Form: {} | Win streak: {}
  Goals: {} scored ({:.1}/game recent)
  Defense: {} conceded ({:.1}/game recent)
  Attack strength: {:.0}% | Defense strength: {:.0}%
  Clean sheets: {:.0}% of matches
  Position: #{} | {:.2} pts/game
  Strength index: {:.3}

"#,
        team.name,
        venue,
        team.wins,
        team.draws,
        team.losses,
        team.win_rate() * 100.0,
        team.form_string(),
        team.win_streak,
        team.goals_for,
        team.recent_goals_scored,
        team.goals_against,
        team.recent_goals_conceded,
        team.attack_strength * 100.0,
        team.defense_strength * 100.0,
        team.clean_sheet_rate * 100.0,
        team.position,
        team.points_per_game,
        team_strength(team)
    )
}

fn sources(ctx: &MatchContext) -> Vec<Source> {
    vec![
        Source {
            title: "Burn neural network".to_string(),
            uri: "https://burn.dev".to_string(),
        },
        Source {
            title: "Synthetic match statistics".to_string(),
            uri: "#".to_string(),
        },
        Source {
            title: format!("{} team stats", ctx.home.name),
            uri: "#".to_string(),
        },
        Source {
            title: format!("{} team stats", ctx.away.name),
            uri: "#".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ProfileSource, SyntheticProfiles};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assembled() -> PredictionData {
        assembled_with(true)
    }

    fn assembled_with(trained: bool) -> PredictionData {
        let mut rng = StdRng::seed_from_u64(8);
        let ctx = SyntheticProfiles::new().match_context("Arsenal", "Liverpool", "Premier League", &mut rng);
        let probs = OutcomeProbabilities {
            raw: [0.514, 0.301, 0.186],
        };
        let inputs = PredictionInputs {
            context: &ctx,
            probabilities: &probs,
            score: Scoreline { home: 2, away: 1 },
            train_accuracy: 0.62,
            val_accuracy: 0.58,
            epochs_completed: 50,
            trained,
        };
        PredictionAssembler::new(&Config::default()).assemble(&inputs)
    }

    #[test]
    fn test_assembled_fields() {
        let data = assembled();
        assert_eq!(data.home_team, "Arsenal");
        assert_eq!(data.away_team, "Liverpool");
        assert_eq!(data.league, "Premier League");
        assert_eq!(data.predicted_score, "2-1");
        assert_eq!(data.probabilities.home, 51);
        assert_eq!(data.probabilities.draw, 30);
        assert_eq!(data.probabilities.away, 19);
        assert_eq!(data.model_used, ModelKind::NeuralNet);
    }

    #[test]
    fn test_key_factors_order() {
        let data = assembled();
        assert_eq!(data.key_factors.len(), 10);
        assert!(data.key_factors[0].starts_with("Arsenal win: 51%"));
        assert!(data.key_factors[0].contains("0.514"));
        assert!(data.key_factors[1].starts_with("Liverpool win: 19%"));
        assert!(data.key_factors[7].contains("58.0%"));
    }

    #[test]
    fn test_analysis_mentions_both_teams() {
        let data = assembled();
        assert!(data.analysis.contains("Arsenal (Home):"));
        assert!(data.analysis.contains("Liverpool (Away):"));
        assert!(data.analysis.contains("62.0% training, 58.0% validation"));
        assert!(data.analysis.contains("Head-to-head:"));
        assert!(data.analysis.contains("50 of 50 epochs completed"));
        assert!(data.analysis.contains("Most likely outcome: Home win"));
        assert!(!data.analysis.contains("Warning"));
    }

    #[test]
    fn test_analysis_flags_failed_training() {
        let data = assembled_with(false);
        assert!(data
            .analysis
            .contains("Warning: training failed, prediction uses best-effort weights"));
    }

    #[test]
    fn test_sources() {
        let data = assembled();
        assert_eq!(data.sources.len(), 4);
        assert_eq!(data.sources[2].title, "Arsenal team stats");
        assert_eq!(data.sources[3].title, "Liverpool team stats");
    }
}
