use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use market_scout::{
    cross_refs_from_value, export_csv, sort_businesses, AppState, Business, CrossReference,
    MarketStats, SortOption, StatsFilter,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "market-scout", about = "Normalize model business listings and map their density")]
struct Cli {
    /// Directory for the telemetry buffer.
    #[arg(long, env = "MARKET_SCOUT_DATA_DIR", default_value = ".market-scout")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Turn raw model text into business records.
    Normalize {
        /// File holding the model response; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        industry: String,
        #[arg(long)]
        location: String,
        /// JSON array of `{title, uri}` hints or grounding chunks.
        #[arg(long)]
        cross_refs: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// rating, reviews, or name.
        #[arg(long)]
        sort: Option<String>,
    },
    /// Bin normalized records into a competitive density grid.
    Density {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        grid: Option<usize>,
    },
    /// Summarize normalized records.
    Stats {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        require_phone: bool,
        #[arg(long)]
        require_website: bool,
        #[arg(long, default_value_t = 0.0)]
        min_rating: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let state = AppState::initialize(&cli.data_dir)
        .with_context(|| format!("failed to initialize in {}", cli.data_dir.display()))?;

    let result = run(&state, cli.command);
    state.shutdown();
    result
}

fn run(state: &AppState, command: Command) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Normalize {
            input,
            industry,
            location,
            cross_refs,
            format,
            sort,
        } => {
            let raw = read_input(input.as_deref())?;
            let cross_refs = match cross_refs {
                Some(path) => load_cross_refs(&path)?,
                None => Vec::new(),
            };
            let mut report = state.ingest(&raw, &industry, &location, &cross_refs);
            if report.is_extraction_failure() {
                info!(
                    outcome = report.outcome.as_str(),
                    "no business array could be read from the input"
                );
            }
            if let Some(sort) = sort {
                let Some(option) = SortOption::parse(&sort) else {
                    bail!("unknown sort option: {sort}");
                };
                sort_businesses(&mut report.businesses, option);
            }
            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &report.businesses)?;
                    writeln!(out)?;
                }
                OutputFormat::Csv => export_csv(&mut out, &report.businesses)?,
            }
        }
        Command::Density { input, grid } => {
            let businesses = read_businesses(input.as_deref())?;
            let map = state.analyze_density(&businesses, grid);
            serde_json::to_writer_pretty(&mut out, &map)?;
            writeln!(out)?;
        }
        Command::Stats {
            input,
            require_phone,
            require_website,
            min_rating,
        } => {
            let businesses = read_businesses(input.as_deref())?;
            let filter = StatsFilter {
                require_phone,
                require_website,
                min_rating,
            };
            let stats = MarketStats::compute(&businesses, &filter);
            serde_json::to_writer_pretty(&mut out, &stats)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn read_businesses(path: Option<&Path>) -> Result<Vec<Business>> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("input is not a normalized business array")
}

fn load_cross_refs(path: &Path) -> Result<Vec<CrossReference>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read cross references {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("cross references are not valid JSON")?;
    Ok(cross_refs_from_value(&value))
}
