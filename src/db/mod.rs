use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::engine::store::{OutcomeFilter, OutcomeStore, PredictionStore, WeightStore};
use crate::engine::weights::WeightState;
use crate::error::{EngineError, EngineResult};

pub mod models;
use models::*;

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        // Other processes may hold the write lock while they learn
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> EngineResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> EngineResult<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> EngineResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            EngineError::PersistenceFailure("database connection lock poisoned".into())
        })
    }

    /// Run raw SQL against the connection (test setup only)
    #[cfg(test)]
    pub fn execute_raw(&self, sql: &str) -> EngineResult<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl PredictionStore for Database {
    fn insert_prediction(&self, pred: &StoredPrediction) -> EngineResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO predictions (
                fixture_id, sport, home_team, away_team, league,
                label, rationale, confidence, factors, result, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                pred.fixture_id,
                pred.sport.as_str(),
                pred.home_team,
                pred.away_team,
                pred.league,
                pred.label,
                pred.rationale,
                pred.confidence,
                serde_json::to_string(&pred.factors)?,
                pred.result,
                pred.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_prediction(&self, id: i64) -> EngineResult<Option<StoredPrediction>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, fixture_id, sport, home_team, away_team, league,
                        label, rationale, confidence, factors, result, created_at
                 FROM predictions WHERE id = ?1",
                params![id],
                map_prediction_row,
            )
            .optional()?;
        row.map(PredictionRow::into_prediction).transpose()
    }
}

impl OutcomeStore for Database {
    fn append(&self, outcome: &OutcomeRecord) -> EngineResult<i64> {
        let conn = self.conn()?;
        insert_outcome(&conn, outcome)
    }

    fn query(&self, filter: &OutcomeFilter) -> EngineResult<Vec<OutcomeRecord>> {
        let conn = self.conn()?;
        select_outcomes(&conn, filter)
    }
}

impl WeightStore for Database {
    fn load(&self) -> EngineResult<WeightState> {
        let conn = self.conn()?;
        load_state(&conn)
    }

    fn save(&self, state: &WeightState) -> EngineResult<()> {
        let conn = self.conn()?;
        upsert_state(&conn, state)
    }

    fn commit_learning<F>(
        &self,
        outcome: &OutcomeRecord,
        settles: Option<i64>,
        step: F,
    ) -> EngineResult<(i64, WeightState)>
    where
        F: FnOnce(WeightState) -> EngineResult<WeightState>,
    {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock before the read, so no other
        // connection can learn from the same starting state
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let state = step(load_state(&tx)?)?;
        if let Some(prediction_id) = settles {
            settle_prediction(&tx, prediction_id, outcome.result)?;
        }
        let id = insert_outcome(&tx, outcome)?;
        upsert_state(&tx, &state)?;
        tx.commit()?;
        Ok((id, state))
    }

    fn rebuild_from_log<F>(&self, replay: F) -> EngineResult<(usize, WeightState)>
    where
        F: FnOnce(&[OutcomeRecord]) -> EngineResult<WeightState>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let log = select_outcomes(&tx, &OutcomeFilter::default())?;
        let state = replay(&log)?;
        upsert_state(&tx, &state)?;
        tx.commit()?;
        Ok((log.len(), state))
    }
}

// ── SQL helpers ─────────────────────────────────────────────────────────────

fn load_state(conn: &Connection) -> EngineResult<WeightState> {
    let json: Option<String> = conn
        .query_row("SELECT state FROM weight_state WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    match json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(WeightState::default()),
    }
}

fn select_outcomes(conn: &Connection, filter: &OutcomeFilter) -> EngineResult<Vec<OutcomeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, fixture_id, predicted_label, confidence, factors, result, recorded_at
         FROM outcomes
         WHERE (?1 IS NULL OR fixture_id = ?1)
           AND (?2 IS NULL OR recorded_at >= ?2)
         ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![filter.fixture_id, filter.since], map_outcome_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(OutcomeRow::into_outcome).collect()
}

fn settle_prediction(conn: &Connection, id: i64, result: OutcomeResult) -> EngineResult<()> {
    let changed = conn.execute(
        "UPDATE predictions SET result = ?1 WHERE id = ?2 AND result = 'pending'",
        params![result.as_str(), id],
    )?;
    if changed == 0 {
        return Err(EngineError::InvalidOutcome(format!(
            "prediction {} is unknown or already settled",
            id
        )));
    }
    Ok(())
}

fn insert_outcome(conn: &Connection, outcome: &OutcomeRecord) -> EngineResult<i64> {
    conn.execute(
        "INSERT INTO outcomes (
            fixture_id, predicted_label, confidence, factors, result, recorded_at
         ) VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            outcome.fixture_id,
            outcome.predicted_label,
            outcome.confidence,
            serde_json::to_string(&outcome.factors)?,
            outcome.result.as_str(),
            outcome.recorded_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn upsert_state(conn: &Connection, state: &WeightState) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO weight_state (id, state, updated_at) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET
            state=excluded.state,
            updated_at=excluded.updated_at",
        params![serde_json::to_string(state)?, Utc::now()],
    )?;
    Ok(())
}

/// Raw outcome columns; JSON and enum columns are decoded afterwards so that
/// decoding errors surface as persistence failures.
struct OutcomeRow {
    id: i64,
    fixture_id: String,
    predicted_label: String,
    confidence: u8,
    factors: String,
    result: String,
    recorded_at: chrono::DateTime<Utc>,
}

impl OutcomeRow {
    fn into_outcome(self) -> EngineResult<OutcomeRecord> {
        let result = self.result.parse::<OutcomeResult>().map_err(|e| {
            EngineError::PersistenceFailure(format!("outcome {}: {}", self.id, e))
        })?;
        Ok(OutcomeRecord {
            id: Some(self.id),
            fixture_id: self.fixture_id,
            predicted_label: self.predicted_label,
            confidence: self.confidence,
            factors: serde_json::from_str(&self.factors)?,
            result,
            recorded_at: self.recorded_at,
        })
    }
}

fn map_outcome_row(row: &rusqlite::Row) -> rusqlite::Result<OutcomeRow> {
    Ok(OutcomeRow {
        id: row.get(0)?,
        fixture_id: row.get(1)?,
        predicted_label: row.get(2)?,
        confidence: row.get(3)?,
        factors: row.get(4)?,
        result: row.get(5)?,
        recorded_at: row.get(6)?,
    })
}

struct PredictionRow {
    id: i64,
    fixture_id: String,
    sport: String,
    home_team: String,
    away_team: String,
    league: String,
    label: String,
    rationale: String,
    confidence: u8,
    factors: String,
    result: String,
    created_at: chrono::DateTime<Utc>,
}

impl PredictionRow {
    fn into_prediction(self) -> EngineResult<StoredPrediction> {
        let sport = self.sport.parse::<Sport>().map_err(|e| {
            EngineError::PersistenceFailure(format!("prediction {}: {}", self.id, e))
        })?;
        Ok(StoredPrediction {
            id: Some(self.id),
            fixture_id: self.fixture_id,
            sport,
            home_team: self.home_team,
            away_team: self.away_team,
            league: self.league,
            label: self.label,
            rationale: self.rationale,
            confidence: self.confidence,
            factors: serde_json::from_str(&self.factors)?,
            result: self.result,
            created_at: self.created_at,
        })
    }
}

fn map_prediction_row(row: &rusqlite::Row) -> rusqlite::Result<PredictionRow> {
    Ok(PredictionRow {
        id: row.get(0)?,
        fixture_id: row.get(1)?,
        sport: row.get(2)?,
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        league: row.get(5)?,
        label: row.get(6)?,
        rationale: row.get(7)?,
        confidence: row.get(8)?,
        factors: row.get(9)?,
        result: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS outcomes (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    fixture_id      TEXT    NOT NULL,
    predicted_label TEXT    NOT NULL,
    confidence      INTEGER NOT NULL,
    factors         TEXT    NOT NULL,
    result          TEXT    NOT NULL,
    recorded_at     TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS weight_state (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    state       TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    fixture_id  TEXT    NOT NULL,
    sport       TEXT    NOT NULL,
    home_team   TEXT    NOT NULL,
    away_team   TEXT    NOT NULL,
    league      TEXT    NOT NULL,
    label       TEXT    NOT NULL,
    rationale   TEXT    NOT NULL,
    confidence  INTEGER NOT NULL,
    factors     TEXT    NOT NULL,
    result      TEXT    NOT NULL DEFAULT 'pending',
    created_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_outcomes_fixture ON outcomes(fixture_id);
CREATE INDEX IF NOT EXISTS idx_outcomes_recorded ON outcomes(recorded_at);
CREATE INDEX IF NOT EXISTS idx_predictions_result ON predictions(result);
"#;
