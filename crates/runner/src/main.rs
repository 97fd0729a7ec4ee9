use std::sync::Arc;

use meridian_clock::SystemClock;
use meridian_runner::{TradingPipeline, load_config, load_default_config};
use tokio::sync::watch;

fn print_help() {
    eprintln!(
        r#"Meridian - signal generation and risk-gated execution pipeline

USAGE:
    meridian [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run with the embedded simulated configuration
    meridian

    # Run with config file
    meridian --config meridian.json
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => load_default_config()?,
    };
    log::info!("Symbols: {:?}", config.feed.symbols);
    log::info!("Initial cash: {}", config.ledger.initial_cash);

    let mut pipeline = TradingPipeline::from_config(config, Arc::new(SystemClock))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    pipeline.run(shutdown_rx).await;

    let portfolio = pipeline.portfolio();
    let performance = pipeline.performance();
    log::info!(
        "Final value {} (cash {}, {} open position(s)), {} closed trade(s), win rate {}",
        portfolio.total_value.round_dp(2),
        portfolio.available_cash.round_dp(2),
        portfolio.positions.len(),
        performance.total_trades,
        performance.win_rate.round_dp(3)
    );
    Ok(())
}
