//! Telegram bot delivery with exponential-backoff retry.
//!
//! Sends a MarkdownV2 message to `https://api.telegram.org/bot<TOKEN>/sendMessage`.
//! Failed attempts are retried up to three times with backoff (1 s, 2 s, 4 s).
//! Runs on an alert worker thread, so blocking here is fine.

use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

use super::{AlertError, AlertSink, RiskAlert};
use crate::config::AlertConfig;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramSink {
    client: reqwest::blocking::Client,
    token: String,
    chat_id: String,
    offset: FixedOffset,
    timezone_label: String,
    evacuation_site: String,
}

impl TelegramSink {
    pub fn new(token: &str, chat_id: &str, config: &AlertConfig) -> Result<Self, AlertError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            offset: local_offset(config.utc_offset_hours),
            timezone_label: config.timezone_label.clone(),
            evacuation_site: config.evacuation_site.clone(),
        })
    }

    /// Renders the alert as MarkdownV2 text.
    pub fn format_message(&self, alert: &RiskAlert) -> String {
        format_message(alert, &self.offset, &self.timezone_label, &self.evacuation_site)
    }

    fn try_send(&self, text: &str) -> Result<(), AlertError> {
        let url = format!("{}/bot{}/sendMessage", API_BASE, self.token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });

        let response = self.client.post(url).json(&payload).send()?;
        if !response.status().is_success() {
            return Err(AlertError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl AlertSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn send(&self, alert: &RiskAlert) -> Result<(), AlertError> {
        let text = self.format_message(alert);
        let delays = RETRY_DELAYS_SECS.map(Duration::from_secs);
        deliver_with_retry(&delays, || self.try_send(&text))
    }
}

/// Calls `attempt` once, then once more after each delay until it succeeds.
/// On exhaustion returns the error from the final attempt.
fn deliver_with_retry(
    delays: &[Duration],
    mut attempt: impl FnMut() -> Result<(), AlertError>,
) -> Result<(), AlertError> {
    for (n, delay) in delays.iter().enumerate() {
        match attempt() {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(attempt = n + 1, error = %e, "Telegram delivery attempt failed, retrying");
                std::thread::sleep(*delay);
            }
        }
    }
    attempt()
}

/// Offset for `hours` east of UTC; out-of-range values fall back to UTC.
pub fn local_offset(hours: i32) -> FixedOffset {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Escapes text for Telegram MarkdownV2.
pub fn escape_markdown_v2(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
    ];

    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the alert text. Only the literal markup is left unescaped.
pub fn format_message(
    alert: &RiskAlert,
    offset: &FixedOffset,
    timezone_label: &str,
    evacuation_site: &str,
) -> String {
    let local = alert.timestamp.with_timezone(offset);
    let time = local.format("%d %b %Y, %H:%M").to_string();

    [
        "🚨 *LANDSLIDE HIGH RISK ALERT* 🚨".to_string(),
        String::new(),
        "⚠️ *Risk Level:* HIGH".to_string(),
        format!("📊 *Risk Score:* {}", escape_markdown_v2(&format!("{:.1}%", alert.risk_score))),
        String::new(),
        format!("Location: {}", escape_markdown_v2(&alert.location)),
        format!(
            "🌧️ Rain: {} \\| 💧 Soil: {} \\| 📐 Tilt: {}",
            escape_markdown_v2(&format!("{:.1}", alert.reading.rain)),
            escape_markdown_v2(&format!("{:.1}%", alert.reading.soil)),
            escape_markdown_v2(&format!("{:.1}°", alert.reading.tilt)),
        ),
        String::new(),
        format!(
            "🕒 *Time \\({}\\):* {}",
            escape_markdown_v2(timezone_label),
            escape_markdown_v2(&time)
        ),
        String::new(),
        format!(
            "⚡ Immediate action may be required\\! Please evacuate to {} to ensure safety\\.",
            escape_markdown_v2(evacuation_site)
        ),
    ]
    .join("\n")
}
