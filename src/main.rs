use anyhow::{anyhow, Context, Result};
use cinetl::{
    init_tracing_once, merge_shards, snapshot_genres, HarvestOptions, HarvestOutcome, Harvester,
    HttpCatalogApi, ENV_API_KEY,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cinetl")]
#[command(about = "Checkpointed movie catalog collector with ratings enrichment")]
#[command(version)]
struct Cli {
    /// Directory holding shards, checkpoint and genre map
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk release years newest-first, enriching and persisting new titles
    Collect {
        /// Newest release year to walk (defaults to the current year)
        #[arg(long)]
        newest_year: Option<u16>,

        /// Oldest release year to walk, inclusive
        #[arg(long)]
        oldest_year: Option<u16>,

        /// Shard size bound in megabytes
        #[arg(long)]
        shard_mb: Option<u64>,

        /// Drop the politeness delays between requests
        #[arg(long)]
        no_delays: bool,
    },

    /// Snapshot the genre id -> name map next to the shards
    Genres,

    /// Concatenate a shard range into one Parquet file
    Merge {
        /// First shard index, inclusive
        #[arg(long)]
        start: u32,

        /// Last shard index, inclusive
        #[arg(long)]
        end: u32,

        /// Output Parquet path
        #[arg(long, default_value = "movies_raw.parquet")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_once();
    fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("create {}", cli.data_dir.display()))?;

    match cli.command {
        Commands::Collect {
            newest_year,
            oldest_year,
            shard_mb,
            no_delays,
        } => run_collect(cli.data_dir, newest_year, oldest_year, shard_mb, no_delays),
        Commands::Genres => run_genres(cli.data_dir),
        Commands::Merge { start, end, output } => run_merge(cli.data_dir, start, end, output),
    }
}

fn run_collect(
    data_dir: PathBuf,
    newest_year: Option<u16>,
    oldest_year: Option<u16>,
    shard_mb: Option<u64>,
    no_delays: bool,
) -> Result<()> {
    let mut opts = HarvestOptions::default()
        .with_data_dir(&data_dir)
        .with_env_credentials();
    let newest = newest_year.unwrap_or(opts.newest_year);
    let oldest = oldest_year.unwrap_or(opts.oldest_year);
    opts = opts.with_year_range(newest, oldest);
    if let Some(mb) = shard_mb {
        opts = opts.with_max_shard_bytes(mb * 1024 * 1024);
    }
    if no_delays {
        opts = opts.with_no_delays();
    }

    let mut harvester = Harvester::from_options(opts)?;
    let flag = harvester.cancel_flag();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, finishing the item in flight");
        flag.cancel();
    })
    .context("install interrupt handler")?;

    let summary = harvester.run()?;
    match summary.outcome {
        HarvestOutcome::Completed => println!(
            "collection complete: {} new, {} total",
            summary.new_records, summary.total_known
        ),
        HarvestOutcome::Exhausted => println!(
            "stopped: every ratings key hit its daily limit ({} new, {} total); rerun once the quotas reset",
            summary.new_records, summary.total_known
        ),
        HarvestOutcome::Interrupted => println!(
            "interrupted: position saved ({} new, {} total); rerun to resume",
            summary.new_records, summary.total_known
        ),
    }
    Ok(())
}

fn run_genres(data_dir: PathBuf) -> Result<()> {
    let opts = HarvestOptions::default()
        .with_data_dir(&data_dir)
        .with_env_credentials();
    if opts.api_key.trim().is_empty() {
        return Err(anyhow!("catalog API key is required (set {ENV_API_KEY})"));
    }
    let api = HttpCatalogApi::new(&opts).context("build catalog client")?;
    let path = snapshot_genres(&api, &data_dir)?;
    println!("genre map written to {}", path.display());
    Ok(())
}

fn run_merge(data_dir: PathBuf, start: u32, end: u32, output: PathBuf) -> Result<()> {
    let report = merge_shards(&data_dir, start, end, &output, true)?;
    println!(
        "{} rows x {} columns from {} shards -> {}",
        report.rows,
        report.columns,
        report.shards_read,
        report.output.display()
    );
    Ok(())
}
