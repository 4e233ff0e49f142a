use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Point NDVI lookups from Sentinel-2 via Google Earth Engine
#[derive(Parser)]
#[command(name = "ndvi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Service-account key file (overrides GEE_PRIVATE_KEY)
    #[arg(short, long, global = true)]
    key_file: Option<PathBuf>,

    /// Earth Engine REST API base URL
    #[arg(long, env = "GEE_API_URL", global = true)]
    api_url: Option<String>,

    /// OAuth token endpoint
    #[arg(long, env = "GEE_TOKEN_URL", global = true)]
    token_url: Option<String>,

    /// Cloud project used for Earth Engine requests
    #[arg(short, long, env = "GEE_PROJECT", global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query NDVI for a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the Earth Engine expressions for a coordinate without running them
    Expression {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { lat, lon, json } => {
            let options = commands::query::Options {
                key_file: cli.key_file,
                api_url: cli.api_url,
                token_url: cli.token_url,
                project: cli.project,
            };
            commands::query::run(options, lat, lon, json).await
        }
        Commands::Expression { lat, lon } => commands::expression::run(lat, lon),
    }
}
