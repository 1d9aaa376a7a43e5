use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Sports the scorer knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Soccer,
    Basketball,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Soccer => "soccer",
            Sport::Basketball => "basketball",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soccer" | "football" | "futebol" => Ok(Sport::Soccer),
            "basketball" | "nba" => Ok(Sport::Basketball),
            other => Err(format!("unsupported sport '{}'", other)),
        }
    }
}

/// A scheduled match as normalised from a fixture source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Provider fixture ID
    pub id: String,
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub league: String,
    pub venue: Option<String>,
    /// Head-to-head decimal odds, when the source quotes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<MatchOdds>,
}

/// Decimal odds for each side of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home: f64,
    pub away: f64,
}

/// Actual result of a previously scored fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeResult {
    Win,
    Loss,
}

impl OutcomeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeResult::Win => "win",
            OutcomeResult::Loss => "loss",
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, OutcomeResult::Win)
    }
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeResult {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "win" => Ok(OutcomeResult::Win),
            "loss" => Ok(OutcomeResult::Loss),
            other => Err(EngineError::InvalidOutcome(format!(
                "result must be 'win' or 'loss', got '{}'",
                other
            ))),
        }
    }
}

/// An append-only record of how a prediction turned out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: Option<i64>,
    pub fixture_id: String,
    pub predicted_label: String,
    /// Confidence stated when the prediction was made (0–100)
    pub confidence: u8,
    /// Factor identifiers that contributed to the prediction. Kept as raw
    /// strings; unknown identifiers are skipped by the learner.
    pub factors: Vec<String>,
    pub result: OutcomeResult,
    pub recorded_at: DateTime<Utc>,
}

/// A generated prediction, as persisted for later result lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: Option<i64>,
    pub fixture_id: String,
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub label: String,
    pub rationale: String,
    pub confidence: u8,
    pub factors: Vec<String>,
    /// "pending" | "win" | "loss"
    pub result: String,
    pub created_at: DateTime<Utc>,
}
