/// Structured logging for the slope monitoring service
///
/// Wraps `tracing-subscriber` setup so every binary gets the same output:
/// `RUST_LOG` wins when set, otherwise the given default directive applies.

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::model::RiskState;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "slope_sentry=info";

/// Installs the global subscriber. Call once, at the top of `main`.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    // A second call (e.g. from tests sharing a process) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Level a scored reading is logged at.
pub fn level_for(state: RiskState) -> Level {
    match state {
        RiskState::High => Level::WARN,
        RiskState::Initializing => Level::DEBUG,
        RiskState::Low | RiskState::Moderate => Level::INFO,
    }
}
