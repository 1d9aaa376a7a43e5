pub mod learner;
pub mod scorer;
pub mod stats;
pub mod store;
pub mod weights;

pub use scorer::PredictionOutput;
pub use stats::StatsSnapshot;

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::db::models::{Fixture, OutcomeRecord, OutcomeResult, StoredPrediction};
use crate::error::{EngineError, EngineResult};
use crate::fixtures::{fetch_upcoming_all, FixtureSource};

use store::{OutcomeFilter, OutcomeStore, PredictionStore, WeightStore};
use weights::WeightState;

/// Entry point for hosts (CLI, scheduled job): scoring, outcome recording and
/// statistics over a set of stores.
///
/// Learning is single-writer: each `record_outcome` reads the state, learns,
/// and commits the outcome with the resulting state in one store transaction,
/// so readers only ever observe whole transitions.
pub struct PredictionEngine<S> {
    store: S,
    writer: Mutex<()>,
}

impl<S> PredictionEngine<S>
where
    S: OutcomeStore + WeightStore + PredictionStore,
{
    pub fn new(store: S) -> Self {
        PredictionEngine {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Score each fixture against the current state.
    pub fn generate_predictions<R: Rng + ?Sized>(
        &self,
        fixtures: &[Fixture],
        rng: &mut R,
    ) -> EngineResult<Vec<PredictionOutput>> {
        if fixtures.is_empty() {
            return Ok(vec![]);
        }
        let state = self.store.load()?;
        let predictions: Vec<_> = fixtures
            .iter()
            .map(|f| scorer::score(f, &state, &mut *rng))
            .collect();
        info!(
            "Generated {} prediction(s) (learned from {} outcome(s))",
            predictions.len(),
            state.total_predictions
        );
        Ok(predictions)
    }

    /// Fetch upcoming fixtures and score them. An unavailable source yields
    /// no predictions rather than an error.
    pub async fn generate_daily<R: Rng + ?Sized>(
        &self,
        sources: &[Arc<dyn FixtureSource>],
        timeout: Duration,
        rng: &mut R,
    ) -> EngineResult<Vec<PredictionOutput>> {
        let fixtures = match fetch_upcoming_all(sources, timeout).await {
            Ok(fixtures) => fixtures,
            Err(EngineError::SourceUnavailable(reason)) => {
                warn!("No fixtures to score: {}", reason);
                return Ok(vec![]);
            }
            Err(e) => return Err(e),
        };
        self.generate_predictions(&fixtures, rng)
    }

    /// Persist predictions as pending; returns their ids in order.
    pub fn save_predictions(&self, predictions: &[PredictionOutput]) -> EngineResult<Vec<i64>> {
        let now = Utc::now();
        predictions
            .iter()
            .map(|p| {
                self.store.insert_prediction(&StoredPrediction {
                    id: None,
                    fixture_id: p.fixture_id.clone(),
                    sport: p.sport,
                    home_team: p.home_team.clone(),
                    away_team: p.away_team.clone(),
                    league: p.league.clone(),
                    label: p.label.clone(),
                    rationale: p.rationale.clone(),
                    confidence: p.confidence,
                    factors: p.factors.iter().map(|f| f.id().to_string()).collect(),
                    result: "pending".to_string(),
                    created_at: now,
                })
            })
            .collect()
    }

    /// Learn from one outcome. The outcome is durable before this returns Ok.
    pub fn record_outcome(&self, outcome: &OutcomeRecord) -> EngineResult<WeightState> {
        self.learn_from(outcome, None)
    }

    /// Record the result of a stored prediction, reusing its label, confidence
    /// and factors. A prediction can be settled once.
    pub fn record_prediction_result(
        &self,
        prediction_id: i64,
        result: OutcomeResult,
    ) -> EngineResult<WeightState> {
        let pred = self.store.get_prediction(prediction_id)?.ok_or_else(|| {
            EngineError::InvalidOutcome(format!("no prediction with id {}", prediction_id))
        })?;
        if pred.result != "pending" {
            return Err(EngineError::InvalidOutcome(format!(
                "prediction {} was already settled as '{}'",
                prediction_id, pred.result
            )));
        }
        let outcome = OutcomeRecord {
            id: None,
            fixture_id: pred.fixture_id,
            predicted_label: pred.label,
            confidence: pred.confidence,
            factors: pred.factors,
            result,
            recorded_at: Utc::now(),
        };
        self.learn_from(&outcome, Some(prediction_id))
    }

    /// Load, learn, append and save as one store transaction, which also
    /// serialises learners in other processes sharing the store.
    fn learn_from(
        &self,
        outcome: &OutcomeRecord,
        settles: Option<i64>,
    ) -> EngineResult<WeightState> {
        learner::validate(outcome)?;
        let _writer = self
            .writer
            .lock()
            .map_err(|_| EngineError::PersistenceFailure("learner lock poisoned".into()))?;

        let earlier = self
            .store
            .query(&OutcomeFilter::fixture(&outcome.fixture_id))?
            .len();
        if earlier > 0 {
            warn!(
                "Fixture {} already has {} recorded outcome(s); counting this one too",
                outcome.fixture_id, earlier
            );
        }

        let (_, state) = self
            .store
            .commit_learning(outcome, settles, |state| learner::learn(state, outcome))?;
        info!(
            "Learned {} on fixture {} (confidence {}): success rate {:.1}% over {} outcome(s)",
            outcome.result,
            outcome.fixture_id,
            outcome.confidence,
            state.success_rate,
            state.total_predictions
        );
        Ok(state)
    }

    pub fn get_statistics(&self) -> EngineResult<StatsSnapshot> {
        self.statistics_at(Utc::now())
    }

    pub fn statistics_at(&self, now: DateTime<Utc>) -> EngineResult<StatsSnapshot> {
        let state = self.store.load()?;
        let recent = self
            .store
            .query(&OutcomeFilter::since(stats::window_start(now)))?;
        Ok(stats::report(&state, &recent, now))
    }

    /// Recompute the state from the full outcome log and save it.
    pub fn rebuild(&self) -> EngineResult<WeightState> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| EngineError::PersistenceFailure("learner lock poisoned".into()))?;
        let (replayed, state) = self.store.rebuild_from_log(|log| learner::replay(log))?;
        info!("Rebuilt weight state from {} outcome(s)", replayed);
        Ok(state)
    }
}
