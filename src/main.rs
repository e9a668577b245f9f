//! Slope Sentry - Landslide Early-Warning Service
//!
//! Receives rain, soil-moisture and tilt readings from a field sensor node,
//! scores each one against the recent history and fixed safety limits,
//! persists the result and raises a Telegram alert on High risk.
//!
//! Usage:
//!   cargo run --release                          # Serve on the configured port
//!   cargo run --release -- --endpoint 9000       # Override the port
//!   cargo run --release -- --config site.toml    # Use another configuration file
//!   cargo run --release -- --memory              # Keep results in memory (no database)
//!
//! Environment:
//!   DATABASE_URL       - PostgreSQL connection string (unless --memory)
//!   TELEGRAM_BOT_TOKEN - Bot token for High-risk alerts (optional)
//!   TELEGRAM_CHAT_ID   - Chat receiving the alerts (optional)
//!   RUST_LOG           - Log filter (default: slope_sentry=info)

use slope_sentry::alert::{self, AlertDispatcher};
use slope_sentry::config::{self, ServiceConfig};
use slope_sentry::db::PgStore;
use slope_sentry::endpoint;
use slope_sentry::logging;
use slope_sentry::monitor::Monitor;
use slope_sentry::store::{MemoryStore, ResultStore};
use std::env;
use std::path::PathBuf;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--config PATH] [--endpoint PORT] [--memory]", program);
    std::process::exit(1);
}

fn main() {
    dotenv::dotenv().ok();
    logging::init(logging::DEFAULT_DIRECTIVE);

    println!("⛰️  Slope Sentry - Landslide Early Warning");
    println!("==========================================\n");

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path = PathBuf::from(config::DEFAULT_CONFIG_PATH);
    let mut port_override: Option<u16> = None;
    let mut in_memory = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => match args.get(i + 1) {
                Some(path) => {
                    config_path = PathBuf::from(path);
                    i += 2;
                }
                None => {
                    eprintln!("Error: --config requires a file path");
                    usage(&args[0]);
                }
            },
            "--endpoint" => match args.get(i + 1).and_then(|p| p.parse().ok()) {
                Some(port) => {
                    port_override = Some(port);
                    i += 2;
                }
                None => {
                    eprintln!("Error: --endpoint requires a port number");
                    usage(&args[0]);
                }
            },
            "--memory" => {
                in_memory = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage(&args[0]);
            }
        }
    }

    println!("📋 Loading configuration from {}...", config_path.display());
    let mut config = config::load_config(&config_path).unwrap_or_else(|e| {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    });
    if let Some(port) = port_override {
        config.server.port = port;
    }
    println!(
        "✓ Window {} readings, warm-up {} readings\n",
        config.scoring.window_size, config.scoring.min_history
    );

    if in_memory {
        println!("💾 Using in-memory store (results are lost on exit)\n");
        serve(MemoryStore::new(), &config);
    } else {
        println!("📊 Connecting to database...");
        let store = PgStore::connect().unwrap_or_else(|e| {
            eprintln!("\n❌ Database initialization failed: {}\n", e);
            std::process::exit(1);
        });
        println!("✓ Database ready\n");
        serve(store, &config);
    }
}

fn serve<S: ResultStore>(store: S, config: &ServiceConfig) {
    let sink = alert::sink_from_env(&config.alert);
    let dispatcher = AlertDispatcher::new(sink, config.alert.workers);
    println!("🔔 Alert sink: {}\n", dispatcher.sink_name());

    let mut monitor = Monitor::new(store, config).with_dispatcher(dispatcher);

    println!("🌐 Starting HTTP endpoint on port {}...", config.server.port);
    if let Err(e) = endpoint::start_endpoint_server(config.server.port, &mut monitor, config.server.history_limit) {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    }
}
