mod calibrate;
mod collect;
mod config;
mod dump;
mod error;
mod fit;
mod geometry;
mod record;
mod segment;
mod sink;

use std::time::Duration;

use clap::Parser;

use config::{Cli, Command, Config};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = Config::load(&cli);

    match cli.command {
        Some(Command::Show) => return dump::run_show(&config),
        Some(Command::Dump { interval_ms }) => {
            return dump::run_dump(&config, Duration::from_millis(interval_ms))
        }
        None => {}
    }

    let screen = match config.validate() {
        Ok(screen) => screen,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("  Pass --width and --height, or set them in elo-calibrate.toml.");
            std::process::exit(2);
        }
    };

    log::info!(
        "elo-calibrate starting (segment={}, update_config={})",
        config.segment,
        if config.update_config {
            config.xorg_config.display().to_string()
        } else {
            "off".into()
        }
    );

    if let Err(e) = calibrate::run(&config, screen) {
        log::error!("Calibration failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
