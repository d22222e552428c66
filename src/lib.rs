//! Football match prediction using a per-request neural classifier
//!
//! Team profiles are synthesized from team names, turned into a 14-slot feature
//! vector, and scored by a feed-forward network that is trained from scratch on a
//! synthetic labelled set for every prediction request.

pub mod cancel;
pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

pub use cancel::CancelFlag;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of recent results kept in a team's form
pub const FORM_LEN: usize = 5;

/// Result of a single past match from one team's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    /// Candidate order used when drawing an initial form slot
    pub const ALL: [FormResult; 3] = [FormResult::Win, FormResult::Draw, FormResult::Loss];

    pub fn symbol(&self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }

    /// League points for the result (3/1/0)
    pub fn points(&self) -> u32 {
        match self {
            FormResult::Win => 3,
            FormResult::Draw => 1,
            FormResult::Loss => 0,
        }
    }

    /// Fractional form value (1/0.5/0)
    pub fn form_value(&self) -> f64 {
        match self {
            FormResult::Win => 1.0,
            FormResult::Draw => 0.5,
            FormResult::Loss => 0.0,
        }
    }
}

impl fmt::Display for FormResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Which side of the fixture a team is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn is_home(&self) -> bool {
        matches!(self, Side::Home)
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "Home"),
            Side::Away => write!(f, "Away"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Side::Home),
            "away" => Ok(Side::Away),
            _ => Err(format!("Unknown side: {}. Use home or away.", s)),
        }
    }
}

/// Statistical profile of one team
///
/// Built by a [`data::ProfileSource`]; every bounded field is clamped on construction
/// by [`TeamProfile::clamped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub name: String,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
    /// Most recent result first
    pub form: [FormResult; FORM_LEN],
    /// League table position (1-18)
    pub position: u32,
    /// Average goals scored per match over the form window
    pub recent_goals_scored: f64,
    /// Average goals conceded per match over the form window
    pub recent_goals_conceded: f64,
    pub win_streak: u32,
    pub clean_sheet_rate: f64,
    pub days_rest: u32,
    pub points_per_game: f64,
    pub home_form_score: f64,
    pub away_form_score: f64,
    pub attack_strength: f64,
    pub defense_strength: f64,
}

impl TeamProfile {
    pub const MIN_POSITION: u32 = 1;
    pub const MAX_POSITION: u32 = 18;
    pub const MIN_DAYS_REST: u32 = 3;
    pub const MAX_DAYS_REST: u32 = 7;

    pub fn total_matches(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    /// Win ratio (0-1), 0 for a team with no matches
    pub fn win_rate(&self) -> f64 {
        match self.total_matches() {
            0 => 0.0,
            n => self.wins as f64 / n as f64,
        }
    }

    pub fn form_wins(&self) -> usize {
        self.form.iter().filter(|r| **r == FormResult::Win).count()
    }

    /// Form as a dash-separated string, e.g. `W-D-L-W-W`
    pub fn form_string(&self) -> String {
        self.form
            .iter()
            .map(|r| r.symbol().to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Leading wins in the form window (most recent first)
    pub fn leading_wins(form: &[FormResult]) -> u32 {
        form.iter().take_while(|r| **r == FormResult::Win).count() as u32
    }

    /// Clamp every bounded field into its declared range
    pub fn clamped(mut self) -> Self {
        self.position = self.position.clamp(Self::MIN_POSITION, Self::MAX_POSITION);
        self.days_rest = self.days_rest.clamp(Self::MIN_DAYS_REST, Self::MAX_DAYS_REST);
        self.win_streak = self.win_streak.min(FORM_LEN as u32);
        self.clean_sheet_rate = unit(self.clean_sheet_rate);
        self.home_form_score = unit(self.home_form_score);
        self.away_form_score = unit(self.away_form_score);
        self.attack_strength = unit(self.attack_strength);
        self.defense_strength = unit(self.defense_strength);
        self.recent_goals_scored = non_negative(self.recent_goals_scored);
        self.recent_goals_conceded = non_negative(self.recent_goals_conceded);
        self.points_per_game = non_negative(self.points_per_game);
        self
    }
}

fn unit(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn non_negative(x: f64) -> f64 {
    if x.is_finite() {
        x.max(0.0)
    } else {
        0.0
    }
}

/// Aggregate historical results between the two teams of a fixture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
}

impl HeadToHead {
    pub fn total(&self) -> u32 {
        self.home_wins + self.draws + self.away_wins
    }

    /// Wins for the given side
    pub fn wins_for(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home_wins,
            Side::Away => self.away_wins,
        }
    }
}

/// Everything the feature extractor needs about one fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchContext {
    pub home: TeamProfile,
    pub away: TeamProfile,
    pub head_to_head: HeadToHead,
    pub league: String,
}

impl MatchContext {
    /// Profile of the given side
    pub fn profile(&self, side: Side) -> &TeamProfile {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Profile of the team opposing the given side
    pub fn opponent(&self, side: Side) -> &TeamProfile {
        self.profile(side.opposite())
    }
}

/// Classifier target classes, in output-neuron order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub const COUNT: usize = 3;

    pub fn index(&self) -> usize {
        match self {
            Outcome::HomeWin => 0,
            Outcome::Draw => 1,
            Outcome::AwayWin => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Outcome::HomeWin),
            1 => Some(Outcome::Draw),
            2 => Some(Outcome::AwayWin),
            _ => None,
        }
    }

    pub fn one_hot(&self) -> [f32; Outcome::COUNT] {
        let mut v = [0.0; Outcome::COUNT];
        v[self.index()] = 1.0;
        v
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::HomeWin => write!(f, "Home win"),
            Outcome::Draw => write!(f, "Draw"),
            Outcome::AwayWin => write!(f, "Away win"),
        }
    }
}

/// Win/draw/loss percentages (rounded, not forced to sum to 100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probabilities {
    pub home: u8,
    pub draw: u8,
    pub away: u8,
}

/// Reference shown alongside a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// Engine that produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// The per-request feed-forward classifier in this crate
    NeuralNet,
    /// Externally hosted language model (rendered by the UI, never produced here)
    LanguageModel,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::NeuralNet => write!(f, "Burn Neural Net"),
            ModelKind::LanguageModel => write!(f, "Language Model"),
        }
    }
}

/// Complete prediction handed to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionData {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub probabilities: Probabilities,
    /// Scoreline formatted as `H-A`
    pub predicted_score: String,
    pub analysis: String,
    pub key_factors: Vec<String>,
    pub sources: Vec<Source>,
    pub model_used: ModelKind,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Failed to initialize the numeric runtime: {0}. Please retry.")]
    Initialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Prediction cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MatchError>;

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Synthetic examples generated per request
    pub samples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
    /// Fraction of the shuffled set held out (taken from the end)
    pub validation_split: f64,
    /// L2 penalty on the kernels of the two normalized blocks
    pub l2_penalty: f64,
    /// Log progress every N epochs
    pub log_every: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub hidden_dims: [usize; 4],
    pub dropout: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for every random draw of a request; unseeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            samples: 2000,
            epochs: 50,
            batch_size: 64,
            learning_rate: 0.002,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-7,
            validation_split: 0.2,
            l2_penalty: 0.001,
            log_every: 10,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            hidden_dims: [64, 48, 32, 16],
            dropout: [0.3, 0.25, 0.2],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig::default(),
            model: ModelConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Number of examples held out for validation
    pub fn validation_len(&self) -> usize {
        (self.samples as f64 * self.validation_split).floor() as usize
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MatchError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| MatchError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MatchError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the training loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.samples == 0 || t.epochs == 0 || t.batch_size == 0 {
            return Err(MatchError::Config(
                "samples, epochs and batch_size must be positive".to_string(),
            ));
        }
        if !(t.learning_rate > 0.0 && t.learning_rate.is_finite()) {
            return Err(MatchError::Config(format!(
                "learning_rate must be positive, got {}",
                t.learning_rate
            )));
        }
        if !(t.validation_split > 0.0 && t.validation_split < 1.0) {
            return Err(MatchError::Config(format!(
                "validation_split must be in (0, 1), got {}",
                t.validation_split
            )));
        }
        let val_len = t.validation_len();
        if val_len == 0 || val_len >= t.samples {
            return Err(MatchError::Config(format!(
                "validation_split {} leaves an empty partition of {} samples",
                t.validation_split, t.samples
            )));
        }
        if !(t.l2_penalty >= 0.0 && t.l2_penalty.is_finite()) {
            return Err(MatchError::Config(format!(
                "l2_penalty must be finite and not negative, got {}",
                t.l2_penalty
            )));
        }
        if let Some(beta) = [t.beta_1, t.beta_2].into_iter().find(|b| !(*b >= 0.0 && *b < 1.0)) {
            return Err(MatchError::Config(format!("Adam betas must be in [0, 1), got {}", beta)));
        }
        if !(t.epsilon > 0.0 && t.epsilon.is_finite()) {
            return Err(MatchError::Config(format!(
                "epsilon must be positive, got {}",
                t.epsilon
            )));
        }
        if self.model.hidden_dims.iter().any(|d| *d == 0) {
            return Err(MatchError::Config("hidden_dims must all be positive".to_string()));
        }
        if let Some(p) = self.model.dropout.iter().find(|p| !(**p >= 0.0 && **p < 1.0)) {
            return Err(MatchError::Config(format!("dropout must be in [0, 1), got {}", p)));
        }
        Ok(())
    }
}
