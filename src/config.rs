use clap::{Args, Parser, Subcommand};

/// Confidence-scored fixture predictions that learn from recorded outcomes
#[derive(Parser, Debug, Clone)]
#[command(name = "fixture-tips", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db", global = true)]
    pub database_path: String,

    /// API-Football key (soccer fixtures). Without it, or when the API fails,
    /// a simulated slate is used.
    #[arg(long, env = "FOOTBALL_API_KEY", global = true)]
    pub football_api_key: Option<String>,

    /// API-Football base URL
    #[arg(
        long,
        env = "FOOTBALL_API_URL",
        default_value = "https://v3.football.api-sports.io",
        global = true
    )]
    pub football_api_url: String,

    /// The Odds API key (NBA fixtures). Without it, or when the API fails,
    /// a simulated slate is used.
    #[arg(long, env = "ODDS_API_KEY", global = true)]
    pub odds_api_key: Option<String>,

    /// The Odds API base URL
    #[arg(
        long,
        env = "ODDS_API_URL",
        default_value = "https://api.the-odds-api.com/v4",
        global = true
    )]
    pub odds_api_url: String,

    /// Maximum fixtures taken from each provider per fetch
    #[arg(long, env = "MAX_FIXTURES_PER_SOURCE", default_value = "10", global = true)]
    pub max_fixtures_per_source: usize,

    /// Per-provider fetch timeout in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "10", global = true)]
    pub provider_timeout_secs: u64,

    /// Seed for label selection (reproducible runs)
    #[arg(long, env = "LABEL_SEED", global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch upcoming fixtures, score and store them, print as JSON
    Generate,
    /// Record the actual result of a prediction and learn from it
    Record(RecordArgs),
    /// Print learning statistics as JSON
    Stats,
    /// Generate predictions on a fixed interval until Ctrl-C
    Run {
        /// Seconds between generation passes
        #[arg(long, env = "GENERATE_INTERVAL_SECS", default_value = "86400")]
        interval_secs: u64,
    },
    /// Recompute the learned weights by replaying every recorded outcome
    Rebuild,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Stored prediction to settle (label, confidence and factors are looked up)
    #[arg(long, conflicts_with_all = ["fixture_id", "label", "confidence", "factors"])]
    pub prediction_id: Option<i64>,

    /// Fixture the outcome belongs to
    #[arg(long, requires_all = ["label", "confidence"])]
    pub fixture_id: Option<String>,

    /// Label that was predicted
    #[arg(long)]
    pub label: Option<String>,

    /// Confidence stated with the prediction (0–100)
    #[arg(long)]
    pub confidence: Option<u8>,

    /// Comma-separated factor identifiers that contributed
    #[arg(long, value_delimiter = ',')]
    pub factors: Vec<String>,

    /// Actual result: "win" or "loss"
    #[arg(long)]
    pub result: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=100).contains(&self.max_fixtures_per_source) {
            anyhow::bail!("max_fixtures_per_source must be between 1 and 100");
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("provider_timeout_secs must be positive");
        }
        match &self.command {
            Command::Run { interval_secs } if *interval_secs == 0 => {
                anyhow::bail!("interval_secs must be positive");
            }
            Command::Record(args) if args.prediction_id.is_none() && args.fixture_id.is_none() => {
                anyhow::bail!("record needs either --prediction-id or --fixture-id");
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["fixture-tips"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&["stats"]);
        assert_eq!(config.max_fixtures_per_source, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn record_by_fixture_parses_factor_list() {
        let config = parse(&[
            "record",
            "--fixture-id",
            "sim-1",
            "--label",
            "Over 2.5 goals",
            "--confidence",
            "75",
            "--factors",
            "home_advantage,recent_form",
            "--result",
            "win",
        ]);
        match &config.command {
            Command::Record(args) => {
                assert_eq!(args.factors, vec!["home_advantage", "recent_form"]);
                assert_eq!(args.confidence, Some(75));
            }
            other => panic!("Expected Record, got {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn record_needs_a_target() {
        let config = parse(&["record", "--result", "win"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn prediction_id_conflicts_with_explicit_fields() {
        let argv = [
            "fixture-tips",
            "record",
            "--prediction-id",
            "3",
            "--label",
            "x",
            "--result",
            "win",
        ];
        assert!(Config::try_parse_from(argv).is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let config = parse(&["run", "--interval-secs", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn fixture_cap_bounds() {
        let config = parse(&["--max-fixtures-per-source", "0", "generate"]);
        assert!(config.validate().is_err());
    }
}
