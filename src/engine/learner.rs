//! Reinforcement rule that folds recorded outcomes into the weight state.
//!
//! Wins push a factor's weight up by [`WIN_STEP`]; losses pull it down by the
//! smaller [`LOSS_STEP`], so weights drift upward over a long mixed history.

use tracing::{debug, warn};

use crate::db::models::OutcomeRecord;
use crate::error::{EngineError, EngineResult};

use super::weights::{ConfidenceBucket, Factor, WeightState, MAX_WEIGHT, MIN_WEIGHT};

pub const WIN_STEP: f64 = 0.10;
pub const LOSS_STEP: f64 = 0.05;

/// Reject payloads the learner cannot use.
pub fn validate(outcome: &OutcomeRecord) -> EngineResult<()> {
    if outcome.fixture_id.trim().is_empty() {
        return Err(EngineError::InvalidOutcome("missing fixture id".into()));
    }
    if outcome.confidence > 100 {
        return Err(EngineError::InvalidOutcome(format!(
            "confidence {} outside 0-100",
            outcome.confidence
        )));
    }
    Ok(())
}

/// Apply one outcome to `state` and return the updated state.
///
/// Success rate and bucket accuracy come from running tallies, which give the
/// same figures as a full scan of the outcome log.
pub fn learn(mut state: WeightState, outcome: &OutcomeRecord) -> EngineResult<WeightState> {
    validate(outcome)?;
    let win = outcome.result.is_win();

    state.total_predictions += 1;
    state.outcomes.record(win);
    state.success_rate = state.outcomes.rate();

    for id in &outcome.factors {
        let Some(factor) = Factor::parse(id) else {
            warn!("Skipping unknown factor '{}' on fixture {}", id, outcome.fixture_id);
            continue;
        };
        let weight = state.factor_weights.entry(factor).or_insert(1.0);
        let step = if win { WIN_STEP } else { -LOSS_STEP };
        *weight = (*weight + step).clamp(MIN_WEIGHT, MAX_WEIGHT);
        debug!("{} weight -> {:.2}", factor, weight);
    }

    let bucket = ConfidenceBucket::of(outcome.confidence as f64);
    let tally = state.bucket_observations.entry(bucket).or_default();
    tally.record(win);
    let accuracy = tally.rate();
    state.confidence_accuracy.insert(bucket, accuracy);

    state.last_updated = Some(outcome.recorded_at);
    Ok(state)
}

/// Rebuild state from scratch by replaying the outcome log in order.
pub fn replay<'a, I>(outcomes: I) -> EngineResult<WeightState>
where
    I: IntoIterator<Item = &'a OutcomeRecord>,
{
    outcomes
        .into_iter()
        .try_fold(WeightState::default(), |state, outcome| learn(state, outcome))
}
