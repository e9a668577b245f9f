/// Result persistence.
///
/// The ingestion pipeline needs exactly two things from storage: the most
/// recent results (to build the statistical window) and a way to persist a
/// new reading with its result. `ResultStore` captures that contract;
/// `db::PgStore` implements it on PostgreSQL and `MemoryStore` keeps
/// everything in process for tests and offline replay.

use chrono::{DateTime, Utc};

use crate::model::{Reading, ScoreResult, StoredResult};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] postgres::Error),

    #[error("stored row is malformed: {0}")]
    Malformed(String),
}

/// Storage contract consumed by the monitor.
pub trait ResultStore {
    /// Up to `limit` results, most recent first.
    fn recent_results(&mut self, limit: usize) -> Result<Vec<StoredResult>, StoreError>;

    /// Persists a raw reading together with its scored result. Either both
    /// are written or neither is.
    fn insert_scored(
        &mut self,
        reading: &Reading,
        at: DateTime<Utc>,
        result: &ScoreResult,
    ) -> Result<StoredResult, StoreError>;

    fn latest_result(&mut self) -> Result<Option<StoredResult>, StoreError> {
        Ok(self.recent_results(1)?.into_iter().next())
    }

    /// Raw readings behind the most recent results, most recent first.
    fn recent_readings(&mut self, limit: usize) -> Result<Vec<Reading>, StoreError> {
        Ok(self
            .recent_results(limit)?
            .into_iter()
            .map(|stored| stored.reading)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Results are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: Vec<(i64, DateTime<Utc>, Reading)>,
    results: Vec<StoredResult>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }
}

impl ResultStore for MemoryStore {
    fn recent_results(&mut self, limit: usize) -> Result<Vec<StoredResult>, StoreError> {
        Ok(self.results.iter().rev().take(limit).cloned().collect())
    }

    fn insert_scored(
        &mut self,
        reading: &Reading,
        at: DateTime<Utc>,
        result: &ScoreResult,
    ) -> Result<StoredResult, StoreError> {
        check_storable(result)?;

        let reading_id = self.readings.len() as i64 + 1;
        let stored = StoredResult {
            id: self.results.len() as i64 + 1,
            reading_id,
            timestamp: at,
            reading: *reading,
            result: result.clone(),
        };
        self.readings.push((reading_id, at, *reading));
        self.results.push(stored.clone());
        Ok(stored)
    }
}

/// Checks a result against the column constraints of `anomaly_results`:
/// score within 0–100 and every numeric field finite.
pub fn check_storable(result: &ScoreResult) -> Result<(), StoreError> {
    if !(0.0..=100.0).contains(&result.risk_score) {
        return Err(StoreError::Malformed(format!("risk_score {} outside 0-100", result.risk_score)));
    }
    for (name, values) in [("z-score", &result.z_scores), ("rolling mean", &result.rolling_mean)] {
        if let Some((channel, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StoreError::Malformed(format!("{} {} is {}", channel, name, value)));
        }
    }
    Ok(())
}
