//! Replay recorded sensor readings through the scoring pipeline
//!
//! Feeds a file of readings, oldest first, through the same monitor the
//! service uses, backed by an in-memory store, and prints one row per
//! reading. Useful for tuning thresholds and the window size against
//! recorded field data before changing a deployment.
//!
//! Input is either a JSON array or one JSON object per line, each shaped
//! like the sensor payload:
//!   {"rain_value": 12.0, "soil_moisture": 41.5, "tilt_value": 3.2}
//!
//! Usage:
//!   cargo run --bin replay_readings -- readings.json
//!   cargo run --bin replay_readings -- readings.jsonl --config site.toml

use slope_sentry::config::{self, ServiceConfig};
use slope_sentry::logging;
use slope_sentry::model::{Reading, RiskState, SensorPayload};
use slope_sentry::monitor::Monitor;
use slope_sentry::store::MemoryStore;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("slope_sentry=warn");

    let args: Vec<String> = std::env::args().collect();
    let mut input: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            arg if input.is_none() && !arg.starts_with("--") => {
                input = Some(PathBuf::from(arg));
                i += 1;
            }
            _ => {
                eprintln!("Usage: {} <readings.json> [--config PATH]", args[0]);
                std::process::exit(1);
            }
        }
    }

    let Some(input) = input else {
        eprintln!("Usage: {} <readings.json> [--config PATH]", args[0]);
        std::process::exit(1);
    };

    let config = match config_path {
        Some(path) => config::load_config(&path)?,
        None => ServiceConfig::default(),
    };

    let contents = std::fs::read_to_string(&input)?;
    let readings = parse_readings(&contents)?;

    println!("⛰️  Replaying {} readings from {}", readings.len(), input.display());
    println!("═══════════════════════════════════════════════════════════════════════════════\n");
    println!(
        "{:>5}  {:>8} {:>8} {:>8}  {:>8} {:>8} {:>8}  {:>7}  {}",
        "#", "rain", "soil", "tilt", "z_rain", "z_soil", "z_tilt", "score", "state"
    );
    println!("───────────────────────────────────────────────────────────────────────────────");

    let mut monitor = Monitor::new(MemoryStore::new(), &config);
    let mut counts = [0usize; 4];

    for (n, reading) in readings.into_iter().enumerate() {
        let stored = monitor.ingest(reading)?;
        let result = &stored.result;
        let marker = match result.risk_state {
            RiskState::High => "🔴",
            RiskState::Moderate => "🟡",
            RiskState::Low => "🟢",
            RiskState::Initializing => "⚪",
        };

        counts[state_index(result.risk_state)] += 1;

        println!(
            "{:>5}  {:>8.2} {:>8.2} {:>8.2}  {:>8.4} {:>8.4} {:>8.4}  {:>7.2}  {} {}",
            n + 1,
            reading.rain,
            reading.soil,
            reading.tilt,
            result.z_scores.rain,
            result.z_scores.soil,
            result.z_scores.tilt,
            result.risk_score,
            marker,
            result.risk_state
        );
    }

    println!("\n📊 Summary");
    println!("   Initializing: {}", counts[0]);
    println!("   Low:          {}", counts[1]);
    println!("   Moderate:     {}", counts[2]);
    println!("   High:         {}", counts[3]);

    Ok(())
}

fn state_index(state: RiskState) -> usize {
    match state {
        RiskState::Initializing => 0,
        RiskState::Low => 1,
        RiskState::Moderate => 2,
        RiskState::High => 3,
    }
}

/// Accepts a JSON array of payloads or one payload per non-empty line.
fn parse_readings(contents: &str) -> Result<Vec<Reading>, serde_json::Error> {
    if contents.trim_start().starts_with('[') {
        let payloads: Vec<SensorPayload> = serde_json::from_str(contents)?;
        return Ok(payloads.into_iter().map(Reading::from).collect());
    }

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<SensorPayload>(line).map(Reading::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_and_lines() {
        let array = r#"[{"rain_value": 1, "soil_moisture": 2, "tilt_value": 3},
                        {"rain_value": 4, "soil_moisture": 5, "tilt_value": 6}]"#;
        let lines = "{\"rain_value\": 1, \"soil_moisture\": 2, \"tilt_value\": 3}\n\n\
                     {\"rain_value\": 4, \"soil_moisture\": 5, \"tilt_value\": 6}\n";

        let from_array = parse_readings(array).unwrap();
        assert_eq!(from_array, parse_readings(lines).unwrap());
        assert_eq!(from_array[1], Reading::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_parse_rejects_bad_line() {
        assert!(parse_readings("{\"rain_value\": 1}\n").is_err());
    }
}
