use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flight_instruments::{app, feed, AppConfig, FlightDeck, Result};

/// Attitude indicator and compass/altimeter demo
#[derive(Parser, Debug)]
#[command(name = "flight-instruments")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(
        short = 'c',
        long,
        env = "FLIGHT_INSTRUMENTS_CONFIG",
        value_name = "FILE",
        default_value = "flight-instruments.toml"
    )]
    config: PathBuf,

    /// Font used for every label, overrides the config file
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Drive the instruments from the simulated sensor feed
    #[arg(long)]
    feed: bool,
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load_or_default(&args.config)?;
    init_logging(&config.logging.filter);
    info!(config = %args.config.display(), "starting");

    if let Some(font) = args.font {
        config.font.path = Some(font);
    }
    if args.feed {
        config.feed.enabled = true;
    }

    let deck = FlightDeck::new(Arc::new(config.geometry()));
    let receiver = if config.feed.enabled {
        Some(feed::spawn(&config.feed)?)
    } else {
        None
    };

    app::run(&config, deck, receiver)
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal error");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
