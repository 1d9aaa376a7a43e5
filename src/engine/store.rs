use chrono::{DateTime, Utc};

use crate::db::models::{OutcomeRecord, StoredPrediction};
use crate::error::EngineResult;

use super::weights::WeightState;

/// Selection over the outcome log. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct OutcomeFilter {
    pub fixture_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl OutcomeFilter {
    pub fn since(since: DateTime<Utc>) -> Self {
        OutcomeFilter {
            since: Some(since),
            ..Default::default()
        }
    }

    pub fn fixture(fixture_id: &str) -> Self {
        OutcomeFilter {
            fixture_id: Some(fixture_id.to_string()),
            ..Default::default()
        }
    }
}

/// Durable append-only log of recorded outcomes.
pub trait OutcomeStore: Send + Sync {
    fn append(&self, outcome: &OutcomeRecord) -> EngineResult<i64>;

    /// Matching outcomes in recording order.
    fn query(&self, filter: &OutcomeFilter) -> EngineResult<Vec<OutcomeRecord>>;
}

/// Persistence for the learned [`WeightState`].
pub trait WeightStore: Send + Sync {
    /// Stored state, or the default state if nothing has been saved yet.
    fn load(&self) -> EngineResult<WeightState>;

    fn save(&self, state: &WeightState) -> EngineResult<()>;

    /// One learning step as a single all-or-nothing write: read the current
    /// state, apply `step`, append `outcome` and save the result. When
    /// `settles` names a stored prediction it is marked with the outcome's
    /// result in the same write, and must still be pending.
    ///
    /// Returns the new outcome id and the saved state.
    fn commit_learning<F>(
        &self,
        outcome: &OutcomeRecord,
        settles: Option<i64>,
        step: F,
    ) -> EngineResult<(i64, WeightState)>
    where
        F: FnOnce(WeightState) -> EngineResult<WeightState>;

    /// Replace the state with `replay` of the whole outcome log, reading the
    /// log and saving the result in one write. Returns the log length too.
    fn rebuild_from_log<F>(&self, replay: F) -> EngineResult<(usize, WeightState)>
    where
        F: FnOnce(&[OutcomeRecord]) -> EngineResult<WeightState>;
}

/// Generated predictions kept around so their results can be reported later.
pub trait PredictionStore: Send + Sync {
    fn insert_prediction(&self, pred: &StoredPrediction) -> EngineResult<i64>;

    fn get_prediction(&self, id: i64) -> EngineResult<Option<StoredPrediction>>;
}
