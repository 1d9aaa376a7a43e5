use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::models::OutcomeRecord;

use super::weights::{ConfidenceBucket, Factor, Tally, WeightState};

/// Length of the trailing window, in days.
pub const TRAILING_WINDOW_DAYS: i64 = 30;

/// Aggregate metrics over the learned state and the outcome log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_predictions: u64,
    pub success_rate: f64,
    /// Win rate over outcomes recorded in the trailing window (0 if none)
    pub last_30_days_rate: f64,
    pub last_30_days_count: usize,
    pub factor_weights: BTreeMap<Factor, f64>,
    pub confidence_accuracy: BTreeMap<ConfidenceBucket, f64>,
    pub bucket_observations: BTreeMap<ConfidenceBucket, Tally>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Build a snapshot as of `now`. Pure read; `outcomes` may be the whole log or
/// any superset of the trailing window.
pub fn report(
    state: &WeightState,
    outcomes: &[OutcomeRecord],
    now: DateTime<Utc>,
) -> StatsSnapshot {
    let cutoff = window_start(now);
    let mut window = Tally::default();
    for outcome in outcomes.iter().filter(|o| o.recorded_at >= cutoff) {
        window.record(outcome.result.is_win());
    }

    StatsSnapshot {
        total_predictions: state.total_predictions,
        success_rate: state.success_rate,
        last_30_days_rate: window.rate(),
        last_30_days_count: window.total as usize,
        factor_weights: state.factor_weights.clone(),
        confidence_accuracy: state.confidence_accuracy.clone(),
        bucket_observations: state.bucket_observations.clone(),
        last_updated: state.last_updated,
    }
}

/// Earliest timestamp that still counts toward the trailing window.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(TRAILING_WINDOW_DAYS)
}
