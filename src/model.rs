/// Core data types for the slope monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// raw sensor readings, threshold configuration, per-sensor status and the
/// risk result produced for every reading. It contains no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Sensor channels
// ---------------------------------------------------------------------------

/// One physical sensor in the monitoring array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Rain,
    Soil,
    Tilt,
}

impl Channel {
    /// All channels, in the order they appear on the wire.
    pub const ALL: [Channel; 3] = [Channel::Rain, Channel::Soil, Channel::Tilt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Rain => "rain",
            Channel::Soil => "soil",
            Channel::Tilt => "tilt",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value of the same type for each of the three channels.
///
/// Used for Z-scores, rolling means, per-sensor status and thresholds so that
/// every per-channel structure serializes as `{ "rain": …, "soil": …, "tilt": … }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerChannel<T> {
    pub rain: T,
    pub soil: T,
    pub tilt: T,
}

impl<T> PerChannel<T> {
    /// Builds a value by evaluating `f` once per channel.
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        PerChannel {
            rain: f(Channel::Rain),
            soil: f(Channel::Soil),
            tilt: f(Channel::Tilt),
        }
    }

    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Rain => &self.rain,
            Channel::Soil => &self.soil,
            Channel::Tilt => &self.tilt,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerChannel<U> {
        PerChannel {
            rain: f(&self.rain),
            soil: f(&self.soil),
            tilt: f(&self.tilt),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl<T: Clone> PerChannel<T> {
    pub fn splat(value: T) -> Self {
        PerChannel {
            rain: value.clone(),
            soil: value.clone(),
            tilt: value,
        }
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single sample from the physical sensor array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub rain: f64,
    pub soil: f64,
    pub tilt: f64,
}

impl Reading {
    pub fn new(rain: f64, soil: f64, tilt: f64) -> Self {
        Reading { rain, soil, tilt }
    }

    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Rain => self.rain,
            Channel::Soil => self.soil,
            Channel::Tilt => self.tilt,
        }
    }
}

/// Ingestion payload posted by the sensor node.
///
/// Field names match the firmware's JSON: `rain_value`, `soil_moisture`,
/// `tilt_value`. All three are required and must be JSON numbers. Other keys
/// the node sends (device id, battery level) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    pub rain_value: f64,
    pub soil_moisture: f64,
    pub tilt_value: f64,
}

impl From<SensorPayload> for Reading {
    fn from(payload: SensorPayload) -> Self {
        Reading::new(payload.rain_value, payload.soil_moisture, payload.tilt_value)
    }
}

/// Trailing window in columnar form, one array per channel.
///
/// Arrays are ordered most-recent-first and must have equal lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub rain: Vec<f64>,
    #[serde(default)]
    pub soil: Vec<f64>,
    #[serde(default)]
    pub tilt: Vec<f64>,
}

impl History {
    pub fn from_readings(readings: &[Reading]) -> Self {
        History {
            rain: readings.iter().map(|r| r.rain).collect(),
            soil: readings.iter().map(|r| r.soil).collect(),
            tilt: readings.iter().map(|r| r.tilt).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold types
// ---------------------------------------------------------------------------

/// Fixed warning/danger cut points for one sensor.
///
/// Invariant: `warning < danger`, both finite. Checked by
/// `scoring::validate_thresholds` before any scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub warning: f64,
    pub danger: f64,
    #[serde(default)]
    pub unit: String,
}

impl ThresholdSpec {
    pub fn new(warning: f64, danger: f64, unit: &str) -> Self {
        ThresholdSpec {
            warning,
            danger,
            unit: unit.to_string(),
        }
    }
}

/// Threshold table for all three sensors.
pub type Thresholds = PerChannel<ThresholdSpec>;

impl Default for PerChannel<ThresholdSpec> {
    /// Engineering limits used when no override is configured.
    ///
    ///   tilt: 15° noticeable ground movement, 25° imminent failure
    ///   soil: 70% saturation beginning, 85% critical pore pressure
    ///   rain: 50 moderate rainfall, 75 heavy rainfall
    fn default() -> Self {
        PerChannel {
            rain: ThresholdSpec::new(50.0, 75.0, ""),
            soil: ThresholdSpec::new(70.0, 85.0, "%"),
            tilt: ThresholdSpec::new(15.0, 25.0, "°"),
        }
    }
}

/// Partial threshold table; channels left out keep their base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    pub rain: Option<ThresholdSpec>,
    pub soil: Option<ThresholdSpec>,
    pub tilt: Option<ThresholdSpec>,
}

impl ThresholdOverrides {
    pub fn apply_to(&self, base: &Thresholds) -> Thresholds {
        PerChannel {
            rain: self.rain.clone().unwrap_or_else(|| base.rain.clone()),
            soil: self.soil.clone().unwrap_or_else(|| base.soil.clone()),
            tilt: self.tilt.clone().unwrap_or_else(|| base.tilt.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification types
// ---------------------------------------------------------------------------

/// Threshold band a raw value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdBand {
    Normal,
    Warning,
    Danger,
}

/// Three-level severity shared by both scorers, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Moderate => 1,
            RiskLevel::High => 2,
        }
    }
}

/// Final state reported for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskState {
    /// Not enough history yet for statistics to mean anything.
    Initializing,
    Low,
    Moderate,
    High,
}

impl RiskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskState::Initializing => "Initializing",
            RiskState::Low => "Low",
            RiskState::Moderate => "Moderate",
            RiskState::High => "High",
        }
    }
}

impl From<RiskLevel> for RiskState {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => RiskState::Low,
            RiskLevel::Moderate => RiskState::Moderate,
            RiskLevel::High => RiskState::High,
        }
    }
}

impl fmt::Display for RiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initializing" => Ok(RiskState::Initializing),
            "Low" => Ok(RiskState::Low),
            "Moderate" => Ok(RiskState::Moderate),
            "High" => Ok(RiskState::High),
            other => Err(format!("unknown risk state '{}'", other)),
        }
    }
}

/// Per-sensor outcome of the fixed-threshold check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStatus {
    pub status: ThresholdBand,
    pub level: RiskLevel,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Risk assessment for one reading. Built fresh on every scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// 0–100, two decimal places.
    pub risk_score: f64,
    pub risk_state: RiskState,
    /// Four decimal places.
    pub z_scores: PerChannel<f64>,
    pub threshold_status: PerChannel<SensorStatus>,
    pub thresholds: Thresholds,
    /// Window mean per channel, two decimal places.
    pub rolling_mean: PerChannel<f64>,
}

/// Stateless scoring request: a reading plus the caller-supplied window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub rain_value: f64,
    pub soil_moisture: f64,
    pub tilt_value: f64,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub thresholds: Option<ThresholdOverrides>,
}

impl ScoreRequest {
    pub fn reading(&self) -> Reading {
        Reading::new(self.rain_value, self.soil_moisture, self.tilt_value)
    }
}

/// A persisted result, tagged with its timestamp and the raw reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub id: i64,
    pub reading_id: i64,
    pub timestamp: DateTime<Utc>,
    pub reading: Reading,
    #[serde(flatten)]
    pub result: ScoreResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert_eq!(RiskLevel::High.rank(), 2);
    }

    #[test]
    fn test_threshold_band_ordering() {
        assert!(ThresholdBand::Normal < ThresholdBand::Warning);
        assert!(ThresholdBand::Warning < ThresholdBand::Danger);
    }

    #[test]
    fn test_default_thresholds() {
        let t = Thresholds::default();
        assert_eq!(t.tilt, ThresholdSpec::new(15.0, 25.0, "°"));
        assert_eq!(t.soil, ThresholdSpec::new(70.0, 85.0, "%"));
        assert_eq!(t.rain, ThresholdSpec::new(50.0, 75.0, ""));
    }

    #[test]
    fn test_overrides_replace_only_given_channels() {
        let overrides = ThresholdOverrides {
            tilt: Some(ThresholdSpec::new(10.0, 20.0, "°")),
            ..Default::default()
        };
        let merged = overrides.apply_to(&Thresholds::default());
        assert_eq!(merged.tilt.warning, 10.0);
        assert_eq!(merged.soil.warning, 70.0);
        assert_eq!(merged.rain.danger, 75.0);
    }

    #[test]
    fn test_risk_state_round_trips_through_str() {
        for state in [RiskState::Initializing, RiskState::Low, RiskState::Moderate, RiskState::High] {
            assert_eq!(state.as_str().parse::<RiskState>(), Ok(state));
        }
        assert!("low".parse::<RiskState>().is_err());
    }

    #[test]
    fn test_sensor_payload_rejects_string_values() {
        let bad = r#"{"rain_value": "10", "soil_moisture": 20, "tilt_value": 5}"#;
        assert!(serde_json::from_str::<SensorPayload>(bad).is_err());

        let good = r#"{"rain_value": 10, "soil_moisture": 20.5, "tilt_value": 5, "device_id": "node-1"}"#;
        let reading: Reading = serde_json::from_str::<SensorPayload>(good).unwrap().into();
        assert_eq!(reading, Reading::new(10.0, 20.5, 5.0));
    }

    #[test]
    fn test_score_request_uses_camel_case() {
        let json = r#"{
            "rainValue": 1, "soilMoisture": 2, "tiltValue": 3,
            "history": { "rain": [1, 1], "soil": [2, 2], "tilt": [3, 3] },
            "thresholds": { "tilt": { "warning": 5, "danger": 9, "unit": "°" } }
        }"#;
        let req: ScoreRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.reading(), Reading::new(1.0, 2.0, 3.0));
        assert_eq!(req.history.tilt, vec![3.0, 3.0]);
        assert_eq!(req.thresholds.unwrap().tilt.unwrap().danger, 9.0);
    }

    #[test]
    fn test_score_result_serializes_flat_camel_case() {
        let result = ScoreResult {
            risk_score: 0.0,
            risk_state: RiskState::Initializing,
            z_scores: PerChannel::splat(0.0),
            threshold_status: PerChannel::splat(SensorStatus {
                status: ThresholdBand::Normal,
                level: RiskLevel::Low,
                message: "Within normal range".to_string(),
            }),
            thresholds: Thresholds::default(),
            rolling_mean: PerChannel::splat(0.0),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["riskState"], "Initializing");
        assert_eq!(value["zScores"]["tilt"], 0.0);
        assert_eq!(value["thresholdStatus"]["rain"]["status"], "normal");
        assert_eq!(value["thresholdStatus"]["rain"]["level"], "Low");
        assert_eq!(value["thresholds"]["tilt"]["unit"], "°");
        assert!(value.get("rollingMean").is_some());
    }
}
