//! Learned state shared by the scorer, learner and stats reporter.
//!
//! The state is an explicit value: callers load it from a [`WeightStore`],
//! pass it into the scorer or learner, and save whatever the learner returns.
//!
//! [`WeightStore`]: super::store::WeightStore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lower bound for every factor weight.
pub const MIN_WEIGHT: f64 = 0.5;
/// Upper bound for every factor weight.
pub const MAX_WEIGHT: f64 = 2.0;
/// Weight every factor starts from.
pub const INITIAL_WEIGHT: f64 = 1.0;

/// Named heuristic inputs whose learned weight shifts confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    HomeAdvantage,
    RecentForm,
    HeadToHead,
    Injuries,
    Motivation,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::HomeAdvantage,
        Factor::RecentForm,
        Factor::HeadToHead,
        Factor::Injuries,
        Factor::Motivation,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Factor::HomeAdvantage => "home_advantage",
            Factor::RecentForm => "recent_form",
            Factor::HeadToHead => "head_to_head",
            Factor::Injuries => "injuries",
            Factor::Motivation => "motivation",
        }
    }

    /// Resolve a factor identifier. Unknown identifiers yield `None`.
    pub fn parse(id: &str) -> Option<Factor> {
        Factor::ALL.into_iter().find(|f| f.id() == id.trim())
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Fixed confidence ranges used to segment historical accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceBucket {
    #[serde(rename = "70-80")]
    Low,
    #[serde(rename = "80-90")]
    Mid,
    #[serde(rename = "90-100")]
    High,
}

impl ConfidenceBucket {
    pub const ALL: [ConfidenceBucket; 3] = [
        ConfidenceBucket::Low,
        ConfidenceBucket::Mid,
        ConfidenceBucket::High,
    ];

    /// Bucket a confidence value. Anything below 80 lands in `70-80`.
    pub fn of(confidence: f64) -> ConfidenceBucket {
        if confidence >= 90.0 {
            ConfidenceBucket::High
        } else if confidence >= 80.0 {
            ConfidenceBucket::Mid
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBucket::Low => "70-80",
            ConfidenceBucket::Mid => "80-90",
            ConfidenceBucket::High => "90-100",
        }
    }
}

impl fmt::Display for ConfidenceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Win/total counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub wins: u64,
    pub total: u64,
}

impl Tally {
    pub fn record(&mut self, win: bool) {
        self.total += 1;
        if win {
            self.wins += 1;
        }
    }

    /// Win percentage in [0, 100]; 0 when nothing was observed.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.wins as f64 / self.total as f64 * 100.0
        }
    }
}

/// Per-factor weights and per-bucket accuracy, derived from the outcome log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightState {
    /// Every weight stays within [`MIN_WEIGHT`, `MAX_WEIGHT`].
    pub factor_weights: BTreeMap<Factor, f64>,
    /// Observed win rate per bucket, 0–100.
    pub confidence_accuracy: BTreeMap<ConfidenceBucket, f64>,
    /// Observation counts behind `confidence_accuracy`; distinguishes
    /// "no data yet" from "0% accurate".
    pub bucket_observations: BTreeMap<ConfidenceBucket, Tally>,
    pub total_predictions: u64,
    /// All-time win rate, 0–100.
    pub success_rate: f64,
    /// Running counter behind `success_rate`.
    pub outcomes: Tally,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for WeightState {
    fn default() -> Self {
        WeightState {
            factor_weights: Factor::ALL.iter().map(|f| (*f, INITIAL_WEIGHT)).collect(),
            confidence_accuracy: ConfidenceBucket::ALL.iter().map(|b| (*b, 0.0)).collect(),
            bucket_observations: ConfidenceBucket::ALL
                .iter()
                .map(|b| (*b, Tally::default()))
                .collect(),
            total_predictions: 0,
            success_rate: 0.0,
            outcomes: Tally::default(),
            last_updated: None,
        }
    }
}

impl WeightState {
    pub fn weight(&self, factor: Factor) -> f64 {
        self.factor_weights
            .get(&factor)
            .copied()
            .unwrap_or(INITIAL_WEIGHT)
    }

    pub fn bucket_accuracy(&self, bucket: ConfidenceBucket) -> f64 {
        self.confidence_accuracy.get(&bucket).copied().unwrap_or(0.0)
    }

    pub fn bucket_tally(&self, bucket: ConfidenceBucket) -> Tally {
        self.bucket_observations
            .get(&bucket)
            .copied()
            .unwrap_or_default()
    }

    /// Historical accuracy for the bucket, or `None` if it has never been observed.
    pub fn observed_accuracy(&self, bucket: ConfidenceBucket) -> Option<f64> {
        if self.bucket_tally(bucket).total == 0 {
            None
        } else {
            Some(self.bucket_accuracy(bucket))
        }
    }
}
