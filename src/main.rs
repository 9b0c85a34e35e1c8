use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use citymap::config::AppConfig;
use citymap::data::Dataset;
use citymap::logging::{Verbosity, init_logging};
use citymap::model::TravelMode;
use citymap::server::{self, AppState};
use citymap::service::GoogleMapsService;
use citymap::session::{MapSession, QueryOutcome};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./citymap.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map API
    Serve {
        /// Address to bind, overrides the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Annotate a route between two places
    Route {
        start: String,
        destination: String,
        /// walk, bike or car (defaults to the configured mode)
        #[arg(short, long)]
        mode: Option<TravelMode>,
    },
    /// Annotate the surroundings of a place
    Place { place: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.verbose, cli.quiet));

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let dataset = Dataset::load(&config.data).context("failed to load datasets")?;

    let api_key = config
        .service
        .api_key
        .clone()
        .unwrap_or_else(|| dataset.secrets.maps_api_key.clone());
    if api_key.is_empty() {
        warn!("no maps API key configured, route and place queries will not resolve");
    }
    let service = Arc::new(GoogleMapsService::new(&config.service, api_key));

    let config = Arc::new(config);
    let mut session = MapSession::new(Arc::new(dataset), Arc::clone(&config), service);

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = Arc::new(AppState::new(session, config.view.wifi_radius_m));
            server::serve(&bind, state).await?;
        }
        Commands::Route {
            start,
            destination,
            mode,
        } => {
            if let Some(mode) = mode {
                session.select_travel_mode(mode);
            }
            let outcome = session.display_route(&start, &destination).await?;
            print_outcome(outcome, &session)?;
        }
        Commands::Place { place } => {
            let outcome = session.show_place_pois(&place).await?;
            print_outcome(outcome, &session)?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: QueryOutcome, session: &MapSession) -> anyhow::Result<()> {
    if outcome != QueryOutcome::Applied {
        info!(?outcome, "nothing to display");
    }
    let json = serde_json::to_string_pretty(&session.snapshot())?;
    println!("{json}");
    Ok(())
}
