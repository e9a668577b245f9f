//! High-risk alerting.
//!
//! The monitor hands a [`RiskAlert`] to an [`AlertDispatcher`], which delivers
//! it through an [`AlertSink`] on a small worker pool. Delivery never blocks
//! the ingestion path and a failed delivery is logged, not propagated.
//!
//! Sinks:
//! - [`telegram::TelegramSink`] - Telegram bot API
//! - [`LogSink`] - logs the alert; used when no bot credentials are set

pub mod telegram;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use threadpool::ThreadPool;

use crate::config::AlertConfig;
use crate::model::{Reading, RiskState, StoredResult};

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// Payload of a High-risk notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAlert {
    pub risk_score: f64,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub reading: Reading,
}

impl RiskAlert {
    /// Builds an alert for a persisted result, if it is High.
    pub fn for_result(stored: &StoredResult, location: &str) -> Option<Self> {
        if stored.result.risk_state != RiskState::High {
            return None;
        }

        Some(RiskAlert {
            risk_score: stored.result.risk_score,
            timestamp: stored.timestamp,
            location: location.to_string(),
            reading: stored.reading,
        })
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The messaging API returned a non-2xx status code.
    #[error("alert API returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for High-risk alerts.
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn send(&self, alert: &RiskAlert) -> Result<(), AlertError>;
}

/// Logs alerts instead of delivering them.
pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn send(&self, alert: &RiskAlert) -> Result<(), AlertError> {
        tracing::warn!(
            location = %alert.location,
            risk_score = alert.risk_score,
            timestamp = %alert.timestamp.to_rfc3339(),
            "HIGH landslide risk (no messaging sink configured)"
        );
        Ok(())
    }
}

/// Picks the Telegram sink when `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`
/// are both set and non-empty, otherwise the log sink.
pub fn sink_from_env(config: &AlertConfig) -> Arc<dyn AlertSink> {
    dotenv::dotenv().ok();

    let token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
    let chat_id = std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default();

    if token.trim().is_empty() || chat_id.trim().is_empty() {
        tracing::warn!("Telegram credentials not configured, High-risk alerts will only be logged");
        return Arc::new(LogSink);
    }

    match telegram::TelegramSink::new(token.trim(), chat_id.trim(), config) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build Telegram client, falling back to log sink");
            Arc::new(LogSink)
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Delivers alerts on a worker pool.
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    pool: ThreadPool,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>, workers: usize) -> Self {
        Self {
            sink,
            pool: ThreadPool::with_name("alert-delivery".to_string(), workers.max(1)),
        }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Queues `alert` for delivery and returns immediately.
    pub fn dispatch(&self, alert: RiskAlert) {
        let sink = Arc::clone(&self.sink);
        self.pool.execute(move || match sink.send(&alert) {
            Ok(()) => tracing::info!(sink = sink.name(), location = %alert.location, "High-risk alert delivered"),
            Err(e) => tracing::error!(sink = sink.name(), error = %e, "High-risk alert delivery failed"),
        });
    }

    /// Blocks until every queued alert has been attempted.
    pub fn wait(&self) {
        self.pool.join();
    }
}
