//! Football match prediction CLI
//!
//! Trains a small neural network on synthetic data for every request and
//! predicts the outcome and score of a single fixture.

use clap::{Parser, Subcommand};
use matchmind::{Config, Result, Side};

#[derive(Parser)]
#[command(name = "matchmind")]
#[command(about = "Football match prediction with a per-request neural network", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a single fixture
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// League or competition name
        #[arg(long, default_value = "Premier League")]
        league: String,
        /// Seed for a reproducible request
        #[arg(long)]
        seed: Option<u64>,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show the synthetic profile of a team
    Profile {
        /// Team name
        team: String,
        /// Profile the team as the away side
        #[arg(long)]
        away: bool,
    },
    /// Show the 14 classifier features for a fixture
    Features {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Side to extract features for
        #[arg(long, default_value = "home")]
        side: Side,
        /// Seed for the head-to-head draw
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write a default config file
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Predict {
            home,
            away,
            league,
            seed,
            epochs,
            format,
        } => commands::predict(config, &home, &away, &league, seed, epochs, format),
        Commands::Profile { team, away } => {
            commands::profile(&team, if away { Side::Away } else { Side::Home })
        }
        Commands::Features {
            home,
            away,
            side,
            seed,
        } => commands::features(&home, &away, side, seed),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use matchmind::data::{ProfileSource, SyntheticProfiles};
    use matchmind::features::{team_strength, MatchFeatures};
    use matchmind::predict::Engine;
    use matchmind::PredictionData;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[cfg(feature = "wgpu")]
    type CliBackend = burn::backend::Autodiff<burn::backend::Wgpu<f32, i32>>;
    #[cfg(not(feature = "wgpu"))]
    type CliBackend = matchmind::predict::TrainingBackend;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'matchmind predict \"Team A\" \"Team B\"' to make a prediction");

        Ok(())
    }

    pub fn predict(
        mut config: Config,
        home: &str,
        away: &str,
        league: &str,
        seed: Option<u64>,
        epochs: Option<usize>,
        format: OutputFormat,
    ) -> Result<()> {
        if let Some(seed) = seed {
            config.engine.seed = Some(seed);
        }
        if let Some(epochs) = epochs {
            config.training.epochs = epochs;
        }

        let engine = Engine::<CliBackend>::new(config)?;
        let prediction = engine.predict(home, away, league)?;

        match format {
            OutputFormat::Table => print!("{}", format_prediction(&prediction)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&prediction).map_err(std::io::Error::other)?;
                println!("{}", json);
            }
        }

        Ok(())
    }

    pub fn profile(team: &str, side: Side) -> Result<()> {
        let profile = SyntheticProfiles::new().profile_for(team, side);

        println!("{} ({})", profile.name, side);
        println!("─────────────────────────────────────────");
        println!(
            "Record:          {}W-{}D-{}L ({} matches)",
            profile.wins,
            profile.draws,
            profile.losses,
            profile.total_matches()
        );
        println!(
            "Goals:           {} for, {} against",
            profile.goals_for, profile.goals_against
        );
        println!("Points:          {} ({:.2}/game)", profile.points, profile.points_per_game);
        println!("Form:            {}", profile.form_string());
        println!("Win streak:      {}", profile.win_streak);
        println!("Position:        #{}", profile.position);
        println!(
            "Recent goals:    {:.1} scored, {:.1} conceded per game",
            profile.recent_goals_scored, profile.recent_goals_conceded
        );
        println!("Clean sheets:    {:.0}%", profile.clean_sheet_rate * 100.0);
        println!("Days rest:       {}", profile.days_rest);
        println!(
            "Venue form:      {:.0}% home, {:.0}% away",
            profile.home_form_score * 100.0,
            profile.away_form_score * 100.0
        );
        println!(
            "Attack/defense:  {:.0}% / {:.0}%",
            profile.attack_strength * 100.0,
            profile.defense_strength * 100.0
        );
        println!("Strength index:  {:.3}", team_strength(&profile));

        Ok(())
    }

    pub fn features(home: &str, away: &str, side: Side, seed: Option<u64>) -> Result<()> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let context = SyntheticProfiles::new().match_context(home, away, "", &mut rng);
        let features = MatchFeatures::from_context(&context, side);

        println!("{} vs {} ({} side)", home, away, side);
        println!("─────────────────────────────────────────");
        for ((name, value), (lo, hi)) in features.named().zip(MatchFeatures::RANGES) {
            println!("{:<22} {:>8.3}   [{}, {}]", name, value, lo, hi);
        }

        Ok(())
    }

    fn format_prediction(pred: &PredictionData) -> String {
        let mut out = format!(
            r#"
┌─────────────────────────────────────────────────┐
│  {} vs {} ({})
├─────────────────────────────────────────────────┤
│  {} win:  {}%
│  Draw:  {}%
│  {} win:  {}%
│  Predicted score:  {}
│  Model:  {}
└─────────────────────────────────────────────────┘
"#,
            pred.home_team,
            pred.away_team,
            pred.league,
            pred.home_team,
            pred.probabilities.home,
            pred.probabilities.draw,
            pred.away_team,
            pred.probabilities.away,
            pred.predicted_score,
            pred.model_used
        );

        out.push_str("\nKey factors:\n");
        for factor in &pred.key_factors {
            out.push_str(&format!("  • {}\n", factor));
        }
        out.push_str(&format!("\n{}\n", pred.analysis));
        out
    }
}
