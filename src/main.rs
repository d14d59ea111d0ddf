//! # Leaderboard Gatherer - Main Entry Point
//!
//! Runs the pipeline end-to-end:
//!
//! 1. Logging in to Garmin Connect (stashed session token or credentials)
//! 2. Extending the wide-format snapshot day by day through yesterday
//! 3. Reshaping the snapshot into one cumulative gapminder CSV per metric

use chrono::NaiveDate;
use clap::Parser;
use color_eyre::Result;
use leaderboard_gatherer::{
    aggregate,
    write_outputs,
    Collector,
    Config,
    GarminClient,
    RateLimited,
    SnapshotStore,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

#[derive(Parser)]
#[command(name = "leaderboard-gatherer")]
#[command(about = "Garmin Connect leaderboard gatherer")]
#[command(version)]
struct Cli {
    /// Path of the wide-format snapshot CSV, extended on every run
    #[arg(long, default_value = "leaderboard.csv")]
    snapshot_file: PathBuf,

    /// Directory the per-metric cumulative CSVs are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// First date to fetch when no snapshot exists yet (YYYY-MM-DD).
    /// Defaults to January 1 of the previous year.
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Year the cumulative outputs are aggregated over.
    /// Defaults to the previous year.
    #[arg(long)]
    year: Option<i32>,

    /// Garmin Connect account email
    #[arg(long, env = "EMAIL")]
    email: Option<String>,

    /// Garmin Connect account password
    #[arg(long, env = "PASSWORD")]
    password: Option<String>,

    /// Where the Garmin session token is stashed between runs
    #[arg(long, env = "GARMINTOKENS")]
    tokenstore: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(EnvFilter::new(format!("leaderboard_gatherer={log_level}"))))
        .with(tracing_error::ErrorLayer::default())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    color_eyre::install()?;

    let config = Config::new(
        cli.snapshot_file,
        cli.output_dir,
        cli.start_date,
        cli.year,
        cli.email,
        cli.password,
        cli.tokenstore,
    )?;

    info!("Starting leaderboard gatherer");
    info!("Snapshot file: {}", config.snapshot_file.display());
    info!("Start date: {}", config.start_date);
    info!("Target year: {}", config.target_year);

    let mut client = GarminClient::new(config.tokenstore.clone());
    client.login(config.email.as_deref(), config.password.as_deref()).await?;

    let store = SnapshotStore::load(&config.snapshot_file)?;
    let mut collector = Collector::new(RateLimited::per_second(client), store);
    let days_appended = collector.run(config.start_date).await?;
    info!(days_appended, "snapshot is up to date");

    let outputs = aggregate(collector.store().rows(), config.target_year);
    let files = write_outputs(&outputs, &config.output_dir)?;
    for file in &files {
        info!("Wrote {}", file.display());
    }

    Ok(())
}
