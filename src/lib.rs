//! slope_sentry: landslide early-warning service for a single monitored slope.
//!
//! # Module structure
//!
//! ```text
//! slope_sentry
//! ├── model      shared data types (Reading, Thresholds, ScoreResult, RiskState, ...)
//! ├── config     service configuration loader (slope_sentry.toml)
//! ├── scoring
//! │   ├── statistical  Z-score anomaly scoring over the rolling window
//! │   ├── threshold    fixed warning/danger band scoring
//! │   └── combine      merges both into one assessment
//! ├── store      ResultStore trait + in-memory implementation
//! ├── db         PostgreSQL connection, schema checks and PgStore
//! ├── monitor    ingestion pipeline: window, score, persist, alert
//! ├── alert
//! │   └── telegram     Telegram bot delivery
//! ├── endpoint   HTTP API (tiny_http)
//! └── logging    tracing subscriber setup
//! ```

pub mod alert;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod scoring;
pub mod store;
