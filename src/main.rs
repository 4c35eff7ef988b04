// src/main.rs
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use obi_trader::config::AppConfig;
use obi_trader::domain::errors::{AppError, AppResult};
use obi_trader::domain::types::Symbol;
use obi_trader::engine::TradingEngine;
use obi_trader::exchange::MockExchangeClient;
use obi_trader::replay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Trade against the exchange in real time
    Live,
    /// Drive the engine from a recording or a synthetic feed
    Replay,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Live => f.write_str("live"),
            Mode::Replay => f.write_str("replay"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "obi-trader", about = "Order book imbalance trading engine")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(default_value = "config/config.yaml")]
    config: PathBuf,

    /// Run mode
    #[arg(long, value_enum, default_value_t = Mode::Live)]
    mode: Mode,

    /// Recorded depth stream (JSON lines) for replay mode
    #[arg(long)]
    file: Option<PathBuf>,

    /// Replay speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Generate this many synthetic depth ticks instead of reading a file
    #[arg(long)]
    synthetic_ticks: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    if cli.config.exists() {
        return AppConfig::load(&cli.config);
    }

    // A replay session works fine on defaults; live trading does not.
    if cli.mode == Mode::Replay {
        log::warn!(
            "Config file {} not found, using defaults for replay",
            cli.config.display()
        );
        return Ok(AppConfig::from_env());
    }

    Err(AppError::Config(format!(
        "config file not found: {}",
        cli.config.display()
    )))
}

fn run(cli: Cli, config: AppConfig) -> AppResult<()> {
    match cli.mode {
        Mode::Live => run_live(config),
        Mode::Replay => run_replay(cli, config),
    }
}

/// Live session. The exchange transport is provided by the client behind
/// `ExchangeClient`; this build wires the simulated exchange plus a paced
/// synthetic stream, which exercises the identical engine path.
fn run_live(config: AppConfig) -> AppResult<()> {
    config.validate_for_live()?;

    let client = Arc::new(MockExchangeClient::new());
    let mut engine = TradingEngine::new(config.clone(), client.clone());
    let running = engine.running_flag();

    install_signal_handler(&engine);
    engine.start()?;

    // Paced producer on its own thread, standing in for the stream client's
    // I/O thread.
    let feed_running = running.clone();
    let feed_client = client.clone();
    let symbol = Symbol::new(config.trading.primary_symbol());
    let feed = std::thread::spawn(move || {
        let mut generator = replay::SyntheticDepthGenerator::new(symbol);
        while feed_running.load(Ordering::Acquire) {
            feed_client.push_depth(&generator.next_update());
            std::thread::sleep(Duration::from_millis(100));
        }
    });

    engine.run();
    feed.join().ok();
    engine.stop();
    Ok(())
}

fn run_replay(cli: Cli, config: AppConfig) -> AppResult<()> {
    let client = Arc::new(MockExchangeClient::new());
    let mut engine = TradingEngine::new(config.clone(), client);
    let running = engine.running_flag();
    let bus = engine.bus();

    install_signal_handler(&engine);
    engine.start()?;

    let symbol = Symbol::new(config.trading.primary_symbol());
    let feed = if let Some(ticks) = cli.synthetic_ticks {
        let feed_running = running.clone();
        std::thread::spawn(move || {
            replay::synthetic_feed(symbol, ticks, &bus, &feed_running);
        })
    } else if let Some(path) = cli.file.clone() {
        let feed_running = running.clone();
        let speed = cli.speed;
        std::thread::spawn(move || {
            if let Err(e) = replay::replay_file(&path, &bus, speed, &feed_running) {
                log::error!("Replay failed: {}", e);
                feed_running.store(false, Ordering::Release);
            }
        })
    } else {
        return Err(AppError::Config(
            "replay mode requires --file or --synthetic-ticks".to_string(),
        ));
    };

    engine.run();
    feed.join().ok();
    engine.stop();
    Ok(())
}

fn install_signal_handler(engine: &TradingEngine<MockExchangeClient>) {
    let running = engine.running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("Received shutdown signal");
        running.store(false, Ordering::Release);
    }) {
        log::warn!("Failed to install signal handler: {}", e);
    }
}
