mod ingest;
mod seed;
mod targets;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "perilmail")]
#[command(about = "Peril-driven insurance outreach toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Populate the persons table with synthetic recipients
    Seed {
        /// Number of persons to generate
        #[arg(long, default_value = "500")]
        count: usize,
        /// Delete existing persons before seeding
        #[arg(long)]
        reset: bool,
    },
    /// Fetch recent earthquakes from the USGS feed and store them
    IngestQuakes {
        /// Bounding box as "minLng,minLat,maxLng,maxLat"
        #[arg(long, default_value = "-125,32,-114,42")]
        bbox: String,
        /// Look-back window in hours
        #[arg(long, default_value = "24")]
        hours: i64,
        /// Minimum magnitude to include
        #[arg(long, default_value = "2.0")]
        min_magnitude: f64,
    },
    /// Preview outreach targets for a stored earthquake
    Targets {
        /// USGS event id of the stored earthquake
        #[arg(long)]
        earthquake_id: String,
        /// Maximum distance from the epicenter in kilometers
        #[arg(long, default_value = "100.0")]
        max_distance_km: f64,
        /// Minimum house value in whole dollars
        #[arg(long, default_value = "100000")]
        min_house_value: i64,
        /// Include recipients who already carry insurance
        #[arg(long)]
        include_insured: bool,
        /// Maximum number of targets to print
        #[arg(long, default_value = "50")]
        limit: usize,
        /// Print targets as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = perilmail_core::load_config_from_env()?;
    let pool_config = perilmail_db::PoolConfig::from_config(&config);
    let pool = perilmail_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Seed { count, reset } => seed::run_seed(&pool, count, reset).await,
        Commands::IngestQuakes {
            bbox,
            hours,
            min_magnitude,
        } => ingest::run_ingest_quakes(&pool, &config, &bbox, hours, min_magnitude).await,
        Commands::Targets {
            earthquake_id,
            max_distance_km,
            min_house_value,
            include_insured,
            limit,
            json,
        } => {
            let args = targets::TargetsArgs {
                earthquake_id,
                max_distance_km,
                min_house_value,
                include_insured,
                limit,
                json,
            };
            targets::run_targets(&pool, &args).await
        }
    }
}
