/// Ingestion pipeline: window → score → persist → alert.
///
/// ## Flow per reading
///
/// 1. Reject non-finite values before touching storage
/// 2. Fetch the most recent `window_size` results (most recent first)
/// 3. Score the reading against that window
/// 4. Persist the raw reading and its result in one atomic write
/// 5. If the result is High, queue an alert on the dispatcher
///
/// The reading being scored is never part of its own window: it is persisted
/// only after scoring. Storage failures abort the call and leave nothing
/// behind; alert failures never reach the caller.

use chrono::Utc;

use crate::alert::{AlertDispatcher, RiskAlert};
use crate::config::ServiceConfig;
use crate::logging;
use crate::model::{Reading, ScoreRequest, ScoreResult, StoredResult, Thresholds};
use crate::scoring::{self, ScoringConfig, ScoringError};
use crate::store::{ResultStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("invalid reading: {0}")]
    Scoring(#[from] ScoringError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Owns the store and scoring configuration for one sensor stream.
pub struct Monitor<S: ResultStore> {
    store: S,
    scoring: ScoringConfig,
    thresholds: Thresholds,
    location: String,
    dispatcher: Option<AlertDispatcher>,
}

impl<S: ResultStore> Monitor<S> {
    pub fn new(store: S, config: &ServiceConfig) -> Self {
        Self {
            store,
            scoring: config.scoring.clone(),
            thresholds: config.thresholds.clone(),
            location: config.alert.location.clone(),
            dispatcher: None,
        }
    }

    /// Enables alert delivery for High results.
    pub fn with_dispatcher(mut self, dispatcher: AlertDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn dispatcher(&self) -> Option<&AlertDispatcher> {
        self.dispatcher.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Scores and persists one reading.
    pub fn ingest(&mut self, reading: Reading) -> Result<StoredResult, MonitorError> {
        scoring::validate_reading(&reading)?;

        let window = self.store.recent_readings(self.scoring.window_size)?;
        let result = scoring::score_reading(&reading, &window, &self.thresholds, &self.scoring)?;

        let stored = self.store.insert_scored(&reading, Utc::now(), &result)?;

        log_result(&stored, window.len());

        if let Some(alert) = RiskAlert::for_result(&stored, &self.location) {
            match &self.dispatcher {
                Some(dispatcher) => dispatcher.dispatch(alert),
                None => tracing::warn!(id = stored.id, "High risk detected but no alert dispatcher configured"),
            }
        }

        Ok(stored)
    }

    /// Scores a request carrying its own window. Nothing is persisted.
    pub fn calculate(&self, request: &ScoreRequest) -> Result<ScoreResult, ScoringError> {
        scoring::score_request(request, &self.thresholds, &self.scoring)
    }

    pub fn latest(&mut self) -> Result<Option<StoredResult>, StoreError> {
        self.store.latest_result()
    }

    pub fn history(&mut self, limit: usize) -> Result<Vec<StoredResult>, StoreError> {
        self.store.recent_results(limit)
    }
}

fn log_result(stored: &StoredResult, window_len: usize) {
    let r = &stored.reading;
    let state = stored.result.risk_state;
    let score = stored.result.risk_score;

    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                id = stored.id,
                rain = r.rain,
                soil = r.soil,
                tilt = r.tilt,
                window = window_len,
                risk_state = %state,
                risk_score = score,
                "Reading scored"
            )
        };
    }

    let level = logging::level_for(state);
    if level == tracing::Level::WARN {
        emit!(tracing::Level::WARN);
    } else if level == tracing::Level::DEBUG {
        emit!(tracing::Level::DEBUG);
    } else {
        emit!(tracing::Level::INFO);
    }
}
